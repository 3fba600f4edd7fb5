#![allow(dead_code)]

use anyhow::{Result, anyhow};
use lotto_history::{DrawRecord, DrawSource, SyncOptions, WinningCombination};
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub enum MockDraw {
    Numbers([i64; 6]),
    Absent,
    TransportError,
}

/// In-memory draw source that records which draws were requested.
pub struct MockSource {
    latest: Option<u32>,
    draws: HashMap<u32, MockDraw>,
    requested: RefCell<Vec<u32>>,
}

impl MockSource {
    /// Every draw in `first..=latest` has a deterministic result.
    pub fn with_history(first: u32, latest: u32) -> Self {
        let draws = (first..=latest)
            .map(|draw_no| (draw_no, MockDraw::Numbers(numbers_for(draw_no))))
            .collect();
        Self {
            latest: Some(latest),
            draws,
            requested: RefCell::new(Vec::new()),
        }
    }

    /// Knows the draws but cannot report the latest one.
    pub fn unreachable_latest(first: u32, last: u32) -> Self {
        let mut source = Self::with_history(first, last);
        source.latest = None;
        source
    }

    pub fn set_latest(&mut self, latest: u32) {
        for draw_no in 1..=latest {
            self.draws
                .entry(draw_no)
                .or_insert_with(|| MockDraw::Numbers(numbers_for(draw_no)));
        }
        self.latest = Some(latest);
    }

    pub fn set_draw(&mut self, draw_no: u32, draw: MockDraw) {
        self.draws.insert(draw_no, draw);
    }

    pub fn requested(&self) -> Vec<u32> {
        self.requested.borrow().clone()
    }

    pub fn clear_requested(&self) {
        self.requested.borrow_mut().clear();
    }
}

impl DrawSource for MockSource {
    async fn latest_index(&self) -> Result<u32> {
        self.latest.ok_or_else(|| anyhow!("connection refused"))
    }

    async fn fetch_draw(&self, draw_no: u32) -> Result<Option<DrawRecord>> {
        self.requested.borrow_mut().push(draw_no);
        match self.draws.get(&draw_no) {
            Some(MockDraw::Numbers(numbers)) => Ok(Some(record(draw_no, *numbers))),
            Some(MockDraw::Absent) | None => Ok(None),
            Some(MockDraw::TransportError) => Err(anyhow!("operation timed out")),
        }
    }
}

/// Lexicographic unranking of `draw_no` among all 6-number combinations, so
/// every draw gets its own distinct result.
pub fn numbers_for(draw_no: u32) -> [i64; 6] {
    let mut rank = u64::from(draw_no);
    let mut numbers = [0i64; 6];
    let mut next = 1u64;
    for (i, slot) in numbers.iter_mut().enumerate() {
        loop {
            let with_next = binomial(45 - next, 5 - i as u64);
            if rank < with_next {
                *slot = next as i64;
                next += 1;
                break;
            }
            rank -= with_next;
            next += 1;
        }
    }
    numbers
}

fn binomial(n: u64, k: u64) -> u64 {
    if k > n {
        return 0;
    }
    (0..k).fold(1, |acc, i| acc * (n - i) / (i + 1))
}

pub fn combo(numbers: [i64; 6]) -> WinningCombination {
    WinningCombination::new(&numbers).unwrap()
}

pub fn record(draw_no: u32, numbers: [i64; 6]) -> DrawRecord {
    let mut main_numbers = [0u8; 6];
    for (slot, n) in main_numbers.iter_mut().zip(numbers) {
        *slot = n as u8;
    }
    DrawRecord {
        draw_no,
        draw_date: None,
        main_numbers,
        bonus: Some(45),
        combination: combo(numbers),
    }
}

pub fn options(window: u32) -> SyncOptions {
    SyncOptions {
        fallback_window_draws: window,
        fallback_latest: 1124,
        fetch_delay: Duration::ZERO,
    }
}

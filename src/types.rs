use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

pub const NUMBERS_PER_DRAW: usize = 6;
pub const MIN_NUMBER: u8 = 1;
pub const MAX_NUMBER: u8 = 45;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CombinationError {
    #[error("expected 6 numbers, got {0}")]
    WrongCount(usize),
    #[error("number {0} is outside 1..=45")]
    OutOfRange(i64),
    #[error("number {0} appears more than once")]
    Duplicate(u8),
}

/// Six distinct main numbers of one draw, kept in ascending order so that
/// equality and hashing follow the sorted tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(into = "Vec<u8>")]
pub struct WinningCombination([u8; NUMBERS_PER_DRAW]);

impl WinningCombination {
    /// Normalises arbitrary-order numbers into a combination.
    pub fn new(numbers: &[i64]) -> Result<Self, CombinationError> {
        if numbers.len() != NUMBERS_PER_DRAW {
            return Err(CombinationError::WrongCount(numbers.len()));
        }

        let mut sorted = [0u8; NUMBERS_PER_DRAW];
        for (slot, &n) in sorted.iter_mut().zip(numbers) {
            if n < i64::from(MIN_NUMBER) || n > i64::from(MAX_NUMBER) {
                return Err(CombinationError::OutOfRange(n));
            }
            *slot = n as u8;
        }
        sorted.sort_unstable();

        if let Some(pair) = sorted.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(CombinationError::Duplicate(pair[0]));
        }

        Ok(Self(sorted))
    }

    /// Caller guarantees six distinct numbers within range.
    pub(crate) fn from_distinct(mut numbers: [u8; NUMBERS_PER_DRAW]) -> Self {
        numbers.sort_unstable();
        debug_assert!(numbers.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(numbers.iter().all(|n| (MIN_NUMBER..=MAX_NUMBER).contains(n)));
        Self(numbers)
    }

    pub fn numbers(&self) -> &[u8; NUMBERS_PER_DRAW] {
        &self.0
    }
}

impl From<WinningCombination> for Vec<u8> {
    fn from(combination: WinningCombination) -> Self {
        combination.0.to_vec()
    }
}

impl fmt::Display for WinningCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "[{}]", joined)
    }
}

/// One draw as reported by the lottery authority. Only `draw_no` and
/// `combination` outlive the fetch.
#[derive(Debug, Clone)]
pub struct DrawRecord {
    pub draw_no: u32,
    pub draw_date: Option<NaiveDate>,
    pub main_numbers: [u8; NUMBERS_PER_DRAW],
    // May coincide with a main number.
    pub bonus: Option<u8>,
    pub combination: WinningCombination,
}

/// Cursor plus the deduplicated set of known winning combinations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub last_synced_index: u32,
    pub combinations: HashSet<WinningCombination>,
}

impl StoreSnapshot {
    pub fn new(last_synced_index: u32, combinations: HashSet<WinningCombination>) -> Self {
        Self {
            last_synced_index,
            combinations,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct LottoNumberResponse {
    #[serde(rename = "returnValue")]
    pub return_value: String,
    #[serde(rename = "drwNo")]
    pub draw_no: Option<u32>,
    #[serde(rename = "drwNoDate")]
    pub draw_date: Option<String>,
    #[serde(rename = "drwtNo1")]
    pub number1: Option<i64>,
    #[serde(rename = "drwtNo2")]
    pub number2: Option<i64>,
    #[serde(rename = "drwtNo3")]
    pub number3: Option<i64>,
    #[serde(rename = "drwtNo4")]
    pub number4: Option<i64>,
    #[serde(rename = "drwtNo5")]
    pub number5: Option<i64>,
    #[serde(rename = "drwtNo6")]
    pub number6: Option<i64>,
    #[serde(rename = "bnusNo")]
    pub bonus: Option<i64>,
}

impl LottoNumberResponse {
    pub fn is_success(&self) -> bool {
        self.return_value == "success"
    }

    /// Main numbers with null fields dropped.
    pub fn main_numbers(&self) -> Vec<i64> {
        [
            self.number1,
            self.number2,
            self.number3,
            self.number4,
            self.number5,
            self.number6,
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Builds a draw record, or `None` when the payload does not carry a full
    /// valid set of main numbers.
    pub fn into_draw_record(self, requested: u32) -> Option<DrawRecord> {
        if !self.is_success() {
            return None;
        }

        let mains = self.main_numbers();
        let combination = WinningCombination::new(&mains).ok()?;

        let mut main_numbers = [0u8; NUMBERS_PER_DRAW];
        for (slot, n) in main_numbers.iter_mut().zip(&mains) {
            *slot = *n as u8;
        }

        let bonus = self
            .bonus
            .filter(|b| (i64::from(MIN_NUMBER)..=i64::from(MAX_NUMBER)).contains(b))
            .map(|b| b as u8);

        let draw_date = self
            .draw_date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());

        Some(DrawRecord {
            draw_no: self.draw_no.unwrap_or(requested),
            draw_date,
            main_numbers,
            bonus,
            combination,
        })
    }
}

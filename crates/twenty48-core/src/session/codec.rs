use thiserror::Error;

use crate::engine::{GameGrid, MAX_TILE_VALUE};

/// Hex characters used per cell in the board encoding.
pub const HEX_PER_CELL: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("board encoding has {found} characters, expected {expected}")]
    BadLength { expected: usize, found: usize },
    #[error("board encoding contains non-hex character {0:?}")]
    BadHex(char),
    #[error("tile exponent {0} is out of range")]
    BadExponent(u32),
    #[error("field `{field}` is not a valid number: {value:?}")]
    BadNumber { field: &'static str, value: String },
}

/// Snapshot of one game as it is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub grid_size: usize,
    /// Row-major tile values, `0` for empty cells.
    pub values: Vec<u32>,
    pub score: u64,
    pub elapsed_nanos: u64,
    pub game_id: u32,
}

impl SessionRecord {
    pub fn from_grid(grid: &GameGrid, score: u64, elapsed_nanos: u64, game_id: u32) -> Self {
        SessionRecord {
            grid_size: grid.grid_size(),
            values: grid.values(),
            score,
            elapsed_nanos,
            game_id,
        }
    }

    pub fn to_grid(&self) -> GameGrid {
        GameGrid::from_values(self.grid_size, &self.values)
    }
}

/// Text fields of an encoded session, one per stored key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSession {
    pub board: String,
    pub score: String,
    pub elapsed_nanos: String,
    pub game_id: String,
}

/// Encode cell values as two hex digits of `log2(value)` each, last cell
/// first. Empty cells encode as `00`.
///
/// ```
/// use twenty48_core::session::codec::encode_board;
/// assert_eq!(encode_board(&[2, 0, 0, 2048]), "0b000001");
/// ```
pub fn encode_board(values: &[u32]) -> String {
    values
        .iter()
        .rev()
        .map(|&v| {
            debug_assert!(v == 0 || v.is_power_of_two(), "tile value {v} is not a power of two");
            let exponent = if v <= 1 { 0 } else { v.trailing_zeros() };
            format!("{exponent:02x}")
        })
        .collect()
}

/// Inverse of [`encode_board`] for a grid of `cells` cells. Exponent `0`
/// decodes to an empty cell; exponents above that of [`MAX_TILE_VALUE`] are
/// rejected.
pub fn decode_board(encoded: &str, cells: usize) -> Result<Vec<u32>, CodecError> {
    let expected = cells * HEX_PER_CELL;
    if let Some(bad) = encoded.chars().find(|c| !c.is_ascii_hexdigit()) {
        return Err(CodecError::BadHex(bad));
    }
    if encoded.len() != expected {
        return Err(CodecError::BadLength { expected, found: encoded.len() });
    }

    let mut values = Vec::with_capacity(cells);
    let mut rest = encoded;
    for _ in 0..cells {
        let (head, pair) = rest.split_at(rest.len() - HEX_PER_CELL);
        rest = head;
        let exponent = u32::from_str_radix(pair, 16)
            .map_err(|_| CodecError::BadHex(pair.chars().next().unwrap_or('?')))?;
        if exponent > MAX_TILE_VALUE.trailing_zeros() {
            return Err(CodecError::BadExponent(exponent));
        }
        let value = 1u32 << exponent;
        values.push(if value > 1 { value } else { 0 });
    }
    Ok(values)
}

pub fn encode_session(record: &SessionRecord) -> EncodedSession {
    EncodedSession {
        board: encode_board(&record.values),
        score: record.score.to_string(),
        elapsed_nanos: record.elapsed_nanos.to_string(),
        game_id: record.game_id.to_string(),
    }
}

pub fn decode_session(
    grid_size: usize,
    encoded: &EncodedSession,
) -> Result<SessionRecord, CodecError> {
    Ok(SessionRecord {
        grid_size,
        values: decode_board(&encoded.board, grid_size * grid_size)?,
        score: parse_field("score", &encoded.score)?,
        elapsed_nanos: parse_field("time", &encoded.elapsed_nanos)?,
        game_id: parse_field("gameID", &encoded.game_id)?,
    })
}

/// Parse a decimal field, naming it in the error.
pub fn parse_field<T: std::str::FromStr>(
    field: &'static str,
    value: &str,
) -> Result<T, CodecError> {
    value.trim().parse().map_err(|_| CodecError::BadNumber {
        field,
        value: value.to_string(),
    })
}

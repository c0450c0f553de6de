use sqlparser::parser::ParserError;

use crate::types::error::{DatabaseError, Position};

#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    #[error("{message}")]
    SqlParser { message: String, position: Position },
    /// Carries the statement's leading keyword.
    #[error("Unsupported statement: {0}")]
    UnsupportedStatement(String),
    #[error("Unsupported expression: {0}")]
    UnsupportedExpression(String),
    #[error("Invalid query structure: {0}")]
    InvalidQuery(String),
    #[error("Invalid literal: {0}")]
    InvalidLiteral(String),
}

impl From<ParserError> for PlannerError {
    fn from(error: ParserError) -> Self {
        let raw = match error {
            ParserError::TokenizerError(message) | ParserError::ParserError(message) => message,
            ParserError::RecursionLimitExceeded => "recursion limit exceeded".to_string(),
        };
        match split_location(&raw) {
            Some((message, position)) => PlannerError::SqlParser {
                message: message.to_string(),
                position,
            },
            None => PlannerError::SqlParser {
                message: raw,
                position: Position::new(0, 0),
            },
        }
    }
}

impl PlannerError {
    /// Text to look for in the statement when the error has no position.
    fn offending_token(&self) -> Option<&str> {
        match self {
            PlannerError::SqlParser { .. } | PlannerError::InvalidQuery(_) => None,
            PlannerError::UnsupportedStatement(token)
            | PlannerError::UnsupportedExpression(token)
            | PlannerError::InvalidLiteral(token) => Some(token),
        }
    }

    /// Convert into a syntax error positioned within `sql`.
    pub fn into_database_error(self, sql: &str) -> DatabaseError {
        let position = match &self {
            PlannerError::SqlParser { position, .. } if position.line > 0 => *position,
            PlannerError::SqlParser { .. } => end_position(sql),
            other => other
                .offending_token()
                .and_then(|token| find_token(sql, token))
                .unwrap_or(Position::new(1, 1)),
        };
        DatabaseError::Syntax {
            position,
            message: self.to_string(),
        }
    }
}

/// Split "<message> at Line: L, Column: C".
fn split_location(raw: &str) -> Option<(&str, Position)> {
    let at = raw.rfind(" at Line: ")?;
    let (message, location) = raw.split_at(at);
    let location = location.trim_start_matches(" at Line: ");
    let (line, column) = location.split_once(", Column: ")?;
    Some((
        message,
        Position::new(line.trim().parse().ok()?, column.trim().parse().ok()?),
    ))
}

/// 1-based position of the first case-insensitive occurrence of `token`.
fn find_token(sql: &str, token: &str) -> Option<Position> {
    let needle = token.to_ascii_lowercase();
    let haystack = sql.to_ascii_lowercase();
    let offset = haystack.find(needle.trim())?;
    Some(position_at(sql, offset))
}

fn end_position(sql: &str) -> Position {
    position_at(sql, sql.len())
}

fn position_at(sql: &str, offset: usize) -> Position {
    let before = &sql[..offset];
    let line = before.matches('\n').count() as u64 + 1;
    let column = match before.rfind('\n') {
        Some(newline) => before[newline + 1..].chars().count() as u64 + 1,
        None => before.chars().count() as u64 + 1,
    };
    Position::new(line, column)
}

//! Identifier validation
//!
//! Table, column and alias names are checked before they are quoted into SQL.
//! Values never pass through here: they are always bound as parameters.

use std::fmt;

/// Validation errors for database identifiers
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Name contains invalid characters (only alphanumeric and underscore allowed)
    InvalidCharacters(String),
    /// Name is longer than the dialect allows
    TooLong {
        name: String,
        length: usize,
        max_length: usize,
    },
    /// Name is empty
    Empty,
    /// Name starts with invalid character (must start with letter or underscore)
    InvalidStartCharacter(String),
    /// Qualified name has more parts than `schema.table.column`
    TooManyParts(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidCharacters(name) => {
                write!(f, "Invalid characters in name '{}': only alphanumeric characters and underscores are allowed", name)
            }
            ValidationError::TooLong {
                name,
                length,
                max_length,
            } => {
                write!(
                    f,
                    "Name '{}' is too long: {} characters (max {})",
                    name, length, max_length
                )
            }
            ValidationError::Empty => write!(f, "Name cannot be empty"),
            ValidationError::InvalidStartCharacter(name) => {
                write!(f, "Name '{}' must start with a letter or underscore", name)
            }
            ValidationError::TooManyParts(name) => {
                write!(f, "Name '{}' has too many dotted parts", name)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// A validated, possibly qualified (`table.column`) identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    parts: Vec<String>,
    wildcard: bool,
}

impl Identifier {
    const MAX_PARTS: usize = 3;

    /// Parse and validate a table, column or alias name
    pub fn parse(name: &str, max_length: Option<usize>) -> Result<Self, ValidationError> {
        Self::parse_parts(name, max_length, false)
    }

    /// Parse an entry of a column list, where the last part may be `*`
    pub fn parse_selected(name: &str, max_length: Option<usize>) -> Result<Self, ValidationError> {
        Self::parse_parts(name, max_length, true)
    }

    fn parse_parts(
        name: &str,
        max_length: Option<usize>,
        allow_wildcard: bool,
    ) -> Result<Self, ValidationError> {
        if name.is_empty() {
            return Err(ValidationError::Empty);
        }

        let raw_parts: Vec<&str> = name.split('.').collect();
        if raw_parts.len() > Self::MAX_PARTS {
            return Err(ValidationError::TooManyParts(name.to_string()));
        }

        let last = raw_parts.len() - 1;
        let wildcard = allow_wildcard && raw_parts[last] == "*";
        let named = if wildcard { &raw_parts[..last] } else { &raw_parts[..] };

        for part in named {
            validate_part(part, max_length)?;
        }

        Ok(Self {
            parts: named.iter().map(|part| part.to_string()).collect(),
            wildcard,
        })
    }

    /// Render with every named part wrapped by `quote`
    pub fn render(&self, quote: impl Fn(&str) -> String) -> String {
        let mut rendered: Vec<String> = self.parts.iter().map(|part| quote(part)).collect();
        if self.wildcard {
            rendered.push("*".to_string());
        }
        rendered.join(".")
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard
    }
}

fn validate_part(part: &str, max_length: Option<usize>) -> Result<(), ValidationError> {
    let first_char = part.chars().next().ok_or(ValidationError::Empty)?;

    if let Some(max_length) = max_length {
        if part.len() > max_length {
            return Err(ValidationError::TooLong {
                name: part.to_string(),
                length: part.len(),
                max_length,
            });
        }
    }

    if !first_char.is_ascii_alphabetic() && first_char != '_' {
        return Err(ValidationError::InvalidStartCharacter(part.to_string()));
    }

    if !part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ValidationError::InvalidCharacters(part.to_string()));
    }

    Ok(())
}

/// Validate a cast target such as `uuid` or `double precision`
pub fn sql_type_name(name: &str) -> Result<String, ValidationError> {
    let words: Vec<&str> = name.split_whitespace().collect();
    if words.is_empty() {
        return Err(ValidationError::Empty);
    }
    for word in &words {
        validate_part(word, None)?;
    }
    Ok(words.join(" "))
}

/// Turn an identifier into a placeholder-safe parameter name (`users.id` -> `users_id`)
pub fn parameter_name(name: &str) -> String {
    let mut sanitized: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if sanitized.is_empty() {
        sanitized = "param".to_string();
    } else if sanitized.starts_with(|c: char| c.is_ascii_digit()) {
        sanitized.insert(0, '_');
    }

    sanitized
}

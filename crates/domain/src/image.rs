//! Container image references (`repository:tag`).

use serde::{Deserialize, Serialize};
use servarr_shared::{ErrorCode, ErrorEnvelope};
use std::fmt;

/// Container image split into the `repository`/`tag` pair Helm charts expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    /// Image repository, including registry host when present.
    pub repository: String,
    /// Image tag.
    pub tag: String,
}

/// Validation failures for image references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRefError {
    /// Input was empty after trimming.
    Empty,
    /// Digest references (`repo@sha256:...`) cannot be expressed as a tag.
    DigestUnsupported {
        /// Raw input.
        input: String,
    },
    /// Input contained whitespace inside the reference.
    InvalidCharacters {
        /// Raw input.
        input: String,
    },
}

impl fmt::Display for ImageRefError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => formatter.write_str("image reference must be non-empty"),
            Self::DigestUnsupported { .. } => {
                formatter.write_str("image digests are not supported; use repository:tag")
            },
            Self::InvalidCharacters { .. } => {
                formatter.write_str("image reference must not contain whitespace")
            },
        }
    }
}

impl std::error::Error for ImageRefError {}

impl From<ImageRefError> for ErrorEnvelope {
    fn from(error: ImageRefError) -> Self {
        let envelope = Self::expected(ErrorCode::new("domain", "invalid_image"), error.to_string());
        match error {
            ImageRefError::Empty => envelope,
            ImageRefError::DigestUnsupported { input }
            | ImageRefError::InvalidCharacters { input } => envelope.with_metadata("input", input),
        }
    }
}

impl ImageRef {
    /// Build an image reference from its parts.
    pub fn new(repository: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            repository: repository.into(),
            tag: tag.into(),
        }
    }

    /// Parse `repository[:tag]`, filling an empty repository or tag from
    /// the defaults.
    ///
    /// The tag separator is the last `:` after the last `/`, so registry
    /// ports (`registry:5000/app:1.0`) stay part of the repository.
    ///
    /// ```
    /// use servarr_domain::ImageRef;
    ///
    /// let image = ImageRef::parse_with_defaults("lscr.io/linuxserver/sonarr", "x", "latest")?;
    /// assert_eq!(image.tag, "latest");
    /// # Ok::<(), servarr_domain::ImageRefError>(())
    /// ```
    pub fn parse_with_defaults(
        input: &str,
        default_repository: &str,
        default_tag: &str,
    ) -> Result<Self, ImageRefError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ImageRefError::Empty);
        }
        if trimmed.contains('@') {
            return Err(ImageRefError::DigestUnsupported {
                input: input.to_string(),
            });
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(ImageRefError::InvalidCharacters {
                input: input.to_string(),
            });
        }

        let (repository, tag) = match trimmed.rsplit_once(':') {
            Some((repository, tag)) if !tag.contains('/') => (repository, tag),
            _ => (trimmed, ""),
        };

        Ok(Self {
            repository: non_empty_or(repository, default_repository),
            tag: non_empty_or(tag, default_tag),
        })
    }

    /// Resolve an optional override against a default image.
    pub fn resolve(override_ref: Option<&str>, default: &Self) -> Result<Self, ImageRefError> {
        match override_ref {
            None => Ok(default.clone()),
            Some(input) => Self::parse_with_defaults(input, &default.repository, &default.tag),
        }
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.repository, self.tag)
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

//! Secret masking for anything that reaches the terminal

/// Token that replaces every secret occurrence in displayed text
pub const MASK_TOKEN: &str = "***";

/// Replaces known secret substrings before text is displayed
///
/// Masking is purely substring based, so a secret embedded in a larger
/// value (a password inside a connection URL, for instance) is still caught.
#[derive(Debug, Clone, Default)]
pub struct SecretMasker {
    /// Secrets ordered longest first
    secrets: Vec<String>,
}

impl SecretMasker {
    /// Create a masker with no secrets
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a masker from a list of secrets
    pub fn from_secrets<I, S>(secrets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut masker = Self::new();
        for secret in secrets {
            masker.add(secret);
        }
        masker
    }

    /// Register a secret. Empty and duplicate secrets are ignored.
    pub fn add<S: Into<String>>(&mut self, secret: S) {
        let secret = secret.into();
        if secret.is_empty() || self.secrets.contains(&secret) {
            return;
        }
        self.secrets.push(secret);
        // Longer first: "admin@123" must win over "admin" or a suffix leaks.
        self.secrets.sort_by(|a, b| b.len().cmp(&a.len()));
    }

    /// Number of registered secrets
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// Return `text` with every registered secret replaced by [`MASK_TOKEN`]
    pub fn mask(&self, text: &str) -> String {
        let mut masked = text.to_string();
        for secret in &self.secrets {
            if masked.contains(secret.as_str()) {
                masked = masked.replace(secret.as_str(), MASK_TOKEN);
            }
        }
        masked
    }

    /// Mask each line of a slice
    pub fn mask_lines(&self, lines: &[String]) -> Vec<String> {
        lines.iter().map(|line| self.mask(line)).collect()
    }
}

//! Password strength rules.
//!
//! Registration and password changes both go through a [`PasswordPolicy`].
//! [`DefaultPasswordPolicy`] rejects short, numeric-only, common and
//! user-derived passwords and reports every failed rule at once.

/// Attributes of the account a password is being chosen for.
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordContext<'a> {
    /// Login name.
    pub username: &'a str,
    /// Email address; only the local part is compared.
    pub email: &'a str,
    /// Given name.
    pub first_name: &'a str,
    /// Family name.
    pub last_name: &'a str,
}

/// A set of password strength rules.
pub trait PasswordPolicy: Send + Sync {
    /// Returns every violated rule, or `Ok(())` when the password is acceptable.
    fn check(&self, password: &str, context: &PasswordContext<'_>) -> Result<(), Vec<String>>;
}

const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "passw0rd", "12345678", "123456789",
    "1234567890", "qwertyuiop", "qwerty123", "qwerty12", "1q2w3e4r", "1qaz2wsx",
    "iloveyou", "sunshine", "princess", "football", "baseball", "welcome1",
    "welcome123", "abc12345", "abcd1234", "letmein1", "trustno1", "superman",
    "starwars", "whatever", "dragon12", "monkey12", "master12", "computer",
    "michelle", "jennifer", "12341234", "11111111", "00000000", "88888888",
    "87654321", "asdfghjk", "asdfasdf", "zaq12wsx", "q1w2e3r4", "changeme",
    "administrator", "admin123", "secret12", "internet", "freedom1", "shadow12",
    "charlie1", "mustang1",
];

/// Built-in policy.
#[derive(Debug, Clone)]
pub struct DefaultPasswordPolicy {
    min_length: usize,
    max_similarity: f64,
}

impl Default for DefaultPasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_similarity: 0.7,
        }
    }
}

impl DefaultPasswordPolicy {
    /// Create the policy with its standard thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn too_similar(&self, password: &str, context: &PasswordContext<'_>) -> Option<&'static str> {
        let password = password.to_lowercase();
        let email_local = context.email.split('@').next().unwrap_or_default();

        let attributes = [
            ("username", context.username),
            ("email address", email_local),
            ("first name", context.first_name),
            ("last name", context.last_name),
        ];

        attributes.into_iter().find_map(|(label, value)| {
            let value = value.to_lowercase();
            if value.is_empty() {
                return None;
            }
            // Compare against the whole value and each word of it.
            let mut parts = std::iter::once(value.as_str()).chain(
                value
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|p| !p.is_empty()),
            );
            let similar = parts.any(|part| similarity(&password, part) >= self.max_similarity);
            similar.then_some(label)
        })
    }
}

impl PasswordPolicy for DefaultPasswordPolicy {
    fn check(&self, password: &str, context: &PasswordContext<'_>) -> Result<(), Vec<String>> {
        let mut failures = Vec::new();

        if password.chars().count() < self.min_length {
            failures.push(format!(
                "This password is too short. It must contain at least {} characters.",
                self.min_length
            ));
        }
        if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
            failures.push("This password is entirely numeric.".to_string());
        }
        if COMMON_PASSWORDS.contains(&password.trim().to_lowercase().as_str()) {
            failures.push("This password is too common.".to_string());
        }
        if let Some(label) = self.too_similar(password, context) {
            failures.push(format!("The password is too similar to the {label}."));
        }

        if failures.is_empty() { Ok(()) } else { Err(failures) }
    }
}

/// Ratio of matching characters, `2 * LCS / (len(a) + len(b))`, in `0.0..=1.0`.
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in &a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (2 * prev[b.len()]) as f64 / total as f64
}

use anyhow::Result;
use argon2::{
    password_hash::{PasswordHasher, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use md5::{Digest, Md5};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9]([a-zA-Z0-9._%+-]*[a-zA-Z0-9])?@[a-zA-Z0-9]([a-zA-Z0-9.-]*[a-zA-Z0-9])?\.[a-zA-Z]{2,}$")
        .expect("Failed to compile email regex")
});

static USERNAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_.]*$").expect("Failed to compile username regex")
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Option<i64>,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub name: Option<String>,
    pub location: Option<String>,
    pub about_me: Option<String>,
    pub avatar_hash: String,
    pub confirmed: bool,
    pub is_active: bool,
    pub member_since: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Gravatar identicon URL for an avatar hash.
pub fn gravatar_url(hash: &str, size: u32) -> String {
    format!(
        "https://secure.gravatar.com/avatar/{}?s={}&d=identicon&r=g",
        hash, size
    )
}

impl User {
    /// Create a new user with a hashed password
    pub fn new(email: String, username: String, password: &str) -> Result<Self> {
        Self::validate_email(&email).map_err(|e| anyhow::anyhow!("Invalid email: {}", e))?;
        Self::validate_username(&username)
            .map_err(|e| anyhow::anyhow!("Invalid username: {}", e))?;

        let password_hash = Self::hash_password(password)?;
        let avatar_hash = Self::compute_avatar_hash(&email);
        let now = Utc::now();

        Ok(Self {
            id: None,
            email,
            username,
            password_hash,
            name: None,
            location: None,
            about_me: None,
            avatar_hash,
            confirmed: false,
            is_active: true,
            member_since: now,
            last_seen: now,
        })
    }

    /// Hash a password using Argon2
    pub fn hash_password(password: &str) -> Result<String> {
        use argon2::password_hash::rand_core::OsRng;

        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
            .to_string();
        Ok(password_hash)
    }

    /// Verify a password against the stored hash
    pub fn verify_password(&self, password: &str) -> Result<bool> {
        use argon2::password_hash::{PasswordHash, PasswordVerifier};

        let parsed_hash = PasswordHash::new(&self.password_hash)
            .map_err(|e| anyhow::anyhow!("Invalid password hash format: {}", e))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(_) => Ok(false),
        }
    }

    /// Change the email and keep the avatar hash in step with it.
    pub fn set_email(&mut self, email: String) -> Result<()> {
        Self::validate_email(&email).map_err(|e| anyhow::anyhow!("Invalid email: {}", e))?;
        self.avatar_hash = Self::compute_avatar_hash(&email);
        self.email = email;
        Ok(())
    }

    pub fn compute_avatar_hash(email: &str) -> String {
        let digest = Md5::digest(email.trim().to_lowercase().as_bytes());
        hex::encode(digest)
    }

    /// Identicon URL for this user's avatar
    pub fn avatar_url(&self, size: u32) -> String {
        gravatar_url(&self.avatar_hash, size)
    }

    /// Record activity
    pub fn ping(&mut self) {
        self.last_seen = Utc::now();
    }

    /// Validate email format
    pub fn validate_email(email: &str) -> Result<(), String> {
        if email.is_empty() {
            return Err("Email cannot be empty".to_string());
        }

        if email.len() > 64 {
            return Err("Email cannot exceed 64 characters".to_string());
        }

        if !EMAIL_REGEX.is_match(email) {
            return Err("Invalid email format".to_string());
        }

        Ok(())
    }

    /// Usernames start with a letter and may contain letters, digits, dots and underscores.
    pub fn validate_username(username: &str) -> Result<(), String> {
        if username.is_empty() {
            return Err("Username cannot be empty".to_string());
        }

        if username.len() > 64 {
            return Err("Username cannot exceed 64 characters".to_string());
        }

        if !USERNAME_REGEX.is_match(username) {
            return Err(
                "Usernames must have only letters, numbers, dots or underscores".to_string(),
            );
        }

        Ok(())
    }

    pub fn is_valid(&self) -> Result<(), String> {
        Self::validate_email(&self.email)?;
        Self::validate_username(&self.username)?;

        if self.password_hash.is_empty() {
            return Err("Password hash cannot be empty".to_string());
        }

        Ok(())
    }
}

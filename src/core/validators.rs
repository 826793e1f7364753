use std::sync::OnceLock;

use regex::Regex;

use crate::config::MIN_PASSWORD_LENGTH;
use crate::core::errors::FieldErrors;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub valid: bool,
    pub errors: FieldErrors,
}

impl ValidationOutcome {
    fn from_errors(errors: FieldErrors) -> Self {
        ValidationOutcome {
            valid: errors.is_empty(),
            errors,
        }
    }
}

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^[0-9A-Za-z]([-.\w]*[0-9A-Za-z])*@([0-9A-Za-z][-\w]*[0-9A-Za-z]\.)+[A-Za-z]{2,9}$")
            .expect("Regex should compile")
    })
}

fn require(errors: &mut FieldErrors, field: &str, value: &str, message: &str) -> bool {
    if value.trim().is_empty() {
        errors.insert(field.to_string(), message.to_string());
        false
    } else {
        true
    }
}

pub fn validate_register(
    name: &str,
    username: &str,
    password: &str,
    confirm_password: &str,
    email: &str,
) -> ValidationOutcome {
    let mut errors = FieldErrors::new();

    require(&mut errors, "name", name, "Name must not be empty");
    require(&mut errors, "username", username, "Username must not be empty");

    if require(&mut errors, "email", email, "Email must not be empty")
        && !email_regex().is_match(email.trim())
    {
        errors.insert("email".into(), "Email must be a valid email address".into());
    }

    if require(&mut errors, "password", password, "Password must not be empty") {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            errors.insert(
                "password".into(),
                format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
            );
        } else if password != confirm_password {
            errors.insert("password".into(), "Passwords must match".into());
        }
    }

    ValidationOutcome::from_errors(errors)
}

pub fn validate_login(username: &str, password: &str) -> ValidationOutcome {
    let mut errors = FieldErrors::new();

    require(&mut errors, "username", username, "Username must not be empty");
    require(&mut errors, "password", password, "Password must not be empty");

    ValidationOutcome::from_errors(errors)
}

use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

const PASSWORD_SPECIALS: &str = "@$!%*?&";
const EMAIL_MAX_LEN: usize = 254;
const PASSWORD_MIN_LEN: usize = 8;
const PASSWORD_MAX_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    FullName,
    Email,
    Password,
    ConfirmPassword,
    /// Login-variant password: length checks only, the account already
    /// enforced composition at signup.
    LoginPassword,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Field::FullName => "Full Name",
            Field::Email => "Email",
            Field::Password | Field::LoginPassword => "Password",
            Field::ConfirmPassword => "Confirm Password",
        }
    }
}

pub fn validate_full_name(value: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if value.trim().is_empty() {
        errors.push("Full Name is required".to_string());
    }
    errors
}

pub fn validate_email(value: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if value.trim().is_empty() {
        errors.push("Email is required".to_string());
    } else {
        if !EMAIL_RE.is_match(value) {
            errors.push("Please enter a valid email address".to_string());
        }
        if value.len() > EMAIL_MAX_LEN {
            errors.push("Email address is too long".to_string());
        }
    }
    errors
}

pub fn validate_password(value: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if value.is_empty() {
        errors.push("Password is required".to_string());
        return errors;
    }
    if value.chars().count() < PASSWORD_MIN_LEN {
        errors.push("Password must be at least 8 characters long".to_string());
    }
    if !value.chars().any(|ch| ch.is_ascii_lowercase()) {
        errors.push("Password must contain at least one lowercase letter".to_string());
    }
    if !value.chars().any(|ch| ch.is_ascii_uppercase()) {
        errors.push("Password must contain at least one uppercase letter".to_string());
    }
    if !value.chars().any(|ch| ch.is_ascii_digit()) {
        errors.push("Password must contain at least one number".to_string());
    }
    if !value.chars().any(|ch| PASSWORD_SPECIALS.contains(ch)) {
        errors.push("Password must contain at least one special character (@$!%*?&)".to_string());
    }
    if value.chars().any(char::is_whitespace) {
        errors.push("Password cannot contain spaces".to_string());
    }
    errors
}

pub fn validate_login_password(value: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if value.is_empty() {
        errors.push("Password is required".to_string());
        return errors;
    }
    if value.chars().count() < PASSWORD_MIN_LEN {
        errors.push("Password must be at least 8 characters long".to_string());
    }
    if value.chars().count() > PASSWORD_MAX_LEN {
        errors.push("Password is too long".to_string());
    }
    errors
}

pub fn validate_confirm_password(value: &str, original: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if value.is_empty() {
        errors.push("Please confirm your password".to_string());
    } else if value != original {
        errors.push("Passwords do not match".to_string());
    }
    errors
}

#[derive(Debug, Clone)]
pub struct FieldState {
    pub field: Field,
    pub value: String,
    pub errors: Vec<String>,
}

impl FieldState {
    fn new(field: Field) -> Self {
        Self {
            field,
            value: String::new(),
            errors: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Explicit per-form validation state. Validation itself is pure: rules
/// read only the form's own field values and write only `errors`.
#[derive(Debug, Clone)]
pub struct Form {
    fields: Vec<FieldState>,
}

pub fn signup_form() -> Form {
    Form::new(vec![
        Field::FullName,
        Field::Email,
        Field::Password,
        Field::ConfirmPassword,
    ])
}

pub fn login_form() -> Form {
    Form::new(vec![Field::Email, Field::LoginPassword])
}

impl Form {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields: fields.into_iter().map(FieldState::new).collect(),
        }
    }

    pub fn fields(&self) -> &[FieldState] {
        &self.fields
    }

    pub fn value(&self, field: Field) -> &str {
        self.state(field).map(|s| s.value.as_str()).unwrap_or("")
    }

    pub fn errors(&self, field: Field) -> &[String] {
        self.state(field).map(|s| s.errors.as_slice()).unwrap_or(&[])
    }

    fn state(&self, field: Field) -> Option<&FieldState> {
        self.fields.iter().find(|s| s.field == field)
    }

    fn state_mut(&mut self, field: Field) -> Option<&mut FieldState> {
        self.fields.iter_mut().find(|s| s.field == field)
    }

    pub fn set_value(&mut self, field: Field, value: impl Into<String>) {
        if let Some(state) = self.state_mut(field) {
            state.value = value.into();
        }
    }

    fn rule_errors(&self, field: Field, value: &str) -> Vec<String> {
        match field {
            Field::FullName => validate_full_name(value),
            Field::Email => validate_email(value),
            Field::Password => validate_password(value),
            Field::LoginPassword => validate_login_password(value),
            Field::ConfirmPassword => {
                validate_confirm_password(value, self.value(Field::Password))
            }
        }
    }

    /// Validates one field. Editing the password also re-checks a
    /// non-empty confirmation, since its validity depends on the password.
    pub fn validate_field(&mut self, field: Field) {
        let errors = self.rule_errors(field, &self.value(field).to_string());
        if let Some(state) = self.state_mut(field) {
            state.errors = errors;
        }

        if field == Field::Password && !self.value(Field::ConfirmPassword).is_empty() {
            let confirm =
                self.rule_errors(Field::ConfirmPassword, &self.value(Field::ConfirmPassword).to_string());
            if let Some(state) = self.state_mut(Field::ConfirmPassword) {
                state.errors = confirm;
            }
        }
    }

    /// Synchronous full re-validation, run on submit. Returns the first
    /// failing field so the caller can bring it into view, or None when
    /// submission may proceed.
    pub fn validate_all(&mut self) -> Option<Field> {
        let fields: Vec<Field> = self.fields.iter().map(|s| s.field).collect();
        for field in &fields {
            self.validate_field(*field);
        }
        self.fields
            .iter()
            .find(|state| !state.is_valid())
            .map(|state| state.field)
    }

    /// Submit is enabled only while every tracked field is simultaneously
    /// valid and non-empty.
    pub fn submittable(&self) -> bool {
        self.fields
            .iter()
            .all(|state| state.is_valid() && !state.value.trim().is_empty())
    }
}

/// Delays handling of rapid repeated events until a quiet interval elapses.
/// `poke` on each event, `ready` from the UI tick; `flush` fires pending
/// work immediately (the blur case).
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            deadline: None,
        }
    }

    pub fn poke(&mut self) {
        self.deadline = Some(Instant::now() + self.quiet);
    }

    pub fn ready(&mut self) -> bool {
        self.ready_at(Instant::now())
    }

    fn ready_at(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    pub fn flush(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn pending(&self) -> bool {
        self.deadline.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_rules() {
        assert_eq!(validate_email("alice@example.com"), Vec::<String>::new());
        assert!(validate_email("")
            .iter()
            .any(|e| e == "Email is required"));
        assert!(validate_email("not-an-email")
            .iter()
            .any(|e| e == "Please enter a valid email address"));
        let long = format!("{}@example.com", "a".repeat(250));
        assert!(validate_email(&long)
            .iter()
            .any(|e| e == "Email address is too long"));
    }

    #[test]
    fn password_rules_accumulate() {
        let errors = validate_password("short");
        assert!(errors.iter().any(|e| e.contains("at least 8")));
        assert!(errors.iter().any(|e| e.contains("uppercase")));
        assert!(errors.iter().any(|e| e.contains("number")));
        assert!(errors.iter().any(|e| e.contains("special character")));

        assert_eq!(validate_password("Str0ng!pass"), Vec::<String>::new());
        assert!(validate_password("Str0ng! pass")
            .iter()
            .any(|e| e == "Password cannot contain spaces"));
    }

    #[test]
    fn login_password_is_less_strict() {
        assert_eq!(validate_login_password("plainlongpassword"), Vec::<String>::new());
        assert!(validate_login_password("short")
            .iter()
            .any(|e| e.contains("at least 8")));
        let long = "a".repeat(200);
        assert!(validate_login_password(&long)
            .iter()
            .any(|e| e == "Password is too long"));
    }

    #[test]
    fn confirmation_must_match() {
        assert_eq!(
            validate_confirm_password("Str0ng!pass", "Str0ng!pass"),
            Vec::<String>::new()
        );
        assert!(validate_confirm_password("different", "Str0ng!pass")
            .iter()
            .any(|e| e == "Passwords do not match"));
        assert!(validate_confirm_password("", "Str0ng!pass")
            .iter()
            .any(|e| e == "Please confirm your password"));
    }

    #[test]
    fn password_edit_revalidates_confirmation() {
        let mut form = signup_form();
        form.set_value(Field::Password, "Str0ng!pass");
        form.set_value(Field::ConfirmPassword, "Str0ng!pass");
        form.validate_field(Field::ConfirmPassword);
        assert!(form.errors(Field::ConfirmPassword).is_empty());

        form.set_value(Field::Password, "Str0ng!pass2");
        form.validate_field(Field::Password);
        assert!(form
            .errors(Field::ConfirmPassword)
            .iter()
            .any(|e| e == "Passwords do not match"));
    }

    #[test]
    fn submit_reports_first_failing_field() {
        let mut form = signup_form();
        form.set_value(Field::FullName, "Alice Example");
        form.set_value(Field::Email, "bad-email");
        form.set_value(Field::Password, "Str0ng!pass");
        form.set_value(Field::ConfirmPassword, "Str0ng!pass");
        assert_eq!(form.validate_all(), Some(Field::Email));
        assert!(!form.submittable());

        form.set_value(Field::Email, "alice@example.com");
        assert_eq!(form.validate_all(), None);
        assert!(form.submittable());
    }

    #[test]
    fn submittable_requires_non_empty_fields() {
        let mut form = login_form();
        assert!(!form.submittable());
        form.set_value(Field::Email, "alice@example.com");
        form.set_value(Field::LoginPassword, "longenough");
        form.validate_all();
        assert!(form.submittable());
    }

    #[test]
    fn debouncer_fires_after_quiet_interval() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        assert!(!debouncer.ready());

        debouncer.poke();
        let now = Instant::now();
        assert!(!debouncer.ready_at(now));
        assert!(debouncer.ready_at(now + Duration::from_millis(400)));
        // One-shot until poked again.
        assert!(!debouncer.ready_at(now + Duration::from_secs(1)));
    }

    #[test]
    fn flush_fires_pending_immediately() {
        let mut debouncer = Debouncer::new(Duration::from_secs(10));
        assert!(!debouncer.flush());
        debouncer.poke();
        assert!(debouncer.flush());
        assert!(!debouncer.pending());
    }
}

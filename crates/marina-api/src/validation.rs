//! Boundary checks for request bodies. Each check returns the cleaned value or
//! a user-facing message; handlers decide whether to report one message or
//! several together.

pub const MIN_PASSWORD_LEN: usize = 6;

/// Trimmed value of a required text field.
pub fn required_text<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, String> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(format!("Le champ '{field}' est requis.")),
    }
}

/// Emails are stored trimmed and lower-cased, and looked up the same way.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Normalized email, provided it looks like `local@domain.tld`.
pub fn validate_email(value: Option<&str>) -> Result<String, String> {
    let email = normalize_email(required_text(value, "email")?);
    if is_email(&email) {
        Ok(email)
    } else {
        Err("L'adresse email n'est pas valide.".to_string())
    }
}

fn is_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
}

/// Passwords are taken verbatim, never trimmed.
pub fn validate_password(value: Option<&str>) -> Result<&str, String> {
    match value {
        Some(p) if p.chars().count() >= MIN_PASSWORD_LEN => Ok(p),
        _ => Err(format!(
            "Le mot de passe doit contenir au moins {MIN_PASSWORD_LEN} caractères."
        )),
    }
}

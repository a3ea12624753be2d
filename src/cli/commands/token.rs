use serde_json::json;

use crate::auth::{generate_jwt, Claims};
use crate::cli::OutputFormat;
use crate::config::AppConfig;

pub fn handle(config: &AppConfig, subject: String, hours: Option<u64>, output_format: OutputFormat) -> anyhow::Result<()> {
    let hours = hours.unwrap_or(config.security.jwt_expiry_hours);
    let claims = Claims::new(subject, hours)?;
    let exp = claims.exp;
    let token = generate_jwt(&config.security, claims)?;

    match output_format {
        OutputFormat::Text => println!("{}", token),
        OutputFormat::Json => println!("{}", json!({ "token": token, "exp": exp })),
    }
    Ok(())
}

//! Prints an argon2 hash for a clinic account password, for use in
//! `CLINIC_USERS`.
//!
//! Usage: `hash-password <password>` or pipe the password on stdin.

use std::io::BufRead;

use anyhow::{bail, Context};

use auth_cell::services::hash_password;

fn main() -> anyhow::Result<()> {
    let password = match std::env::args().nth(1) {
        Some(password) => password,
        None => {
            let mut line = String::new();
            std::io::stdin()
                .lock()
                .read_line(&mut line)
                .context("Failed to read password from stdin")?;
            line.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    if password.is_empty() {
        bail!("Password must not be empty");
    }

    println!("{}", hash_password(&password)?);
    Ok(())
}

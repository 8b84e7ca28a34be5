//! Interactive prompts for passphrases, tokens and confirmations.

use anyhow::Result;
use dialoguer::{Confirm, Password};
use std::fmt;
use std::io;

/// The user pressed Ctrl-C at a prompt
#[derive(Debug)]
pub struct Interrupted;

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("interrupted")
    }
}

impl std::error::Error for Interrupted {}

fn map_prompt_error(err: dialoguer::Error) -> anyhow::Error {
    let dialoguer::Error::IO(io_err) = err;
    if io_err.kind() == io::ErrorKind::Interrupted {
        anyhow::Error::new(Interrupted)
    } else {
        anyhow::Error::new(io_err).context("Failed to read from the terminal")
    }
}

pub fn confirm(question: &str) -> Result<bool> {
    Confirm::new()
        .with_prompt(question)
        .default(false)
        .interact()
        .map_err(map_prompt_error)
}

pub fn secret(prompt: &str) -> Result<String> {
    Password::new()
        .with_prompt(prompt)
        .allow_empty_password(true)
        .interact()
        .map_err(map_prompt_error)
}

/// Passphrase source for an encrypted signing key.
///
/// Returns `None` once the user interrupted, which makes signing give up;
/// the interruption is remembered in `interrupted`.
pub fn passphrase_source(interrupted: &mut bool) -> impl FnMut(&str, u32) -> Option<String> + '_ {
    move |key: &str, attempt: u32| {
        let label = if attempt == 1 {
            format!("Passphrase for {}", key)
        } else {
            format!("Wrong passphrase, try again ({})", key)
        };

        match secret(&label) {
            Ok(passphrase) => Some(passphrase),
            Err(e) => {
                if e.is::<Interrupted>() {
                    *interrupted = true;
                } else {
                    log::warn!("{:#}", e);
                }
                None
            }
        }
    }
}

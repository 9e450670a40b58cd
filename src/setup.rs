//! Interactive credential setup.
//!
//! `configure` on every connection follows the same flow: offer to keep an
//! existing working credential, print instructions, read the credential(s),
//! verify them against the live platform, and only then persist them.

use std::collections::{HashMap, VecDeque};
use std::io::{self, BufRead, Write};

use crate::credentials::CredentialStore;
use crate::error::Result;

/// Operator-facing prompt used during setup.
pub trait SetupPrompt {
    /// Show a line of text.
    fn say(&mut self, text: &str);

    /// Ask a question; `None` when no answer can be read.
    fn ask(&mut self, question: &str) -> Option<String>;
}

/// Prompt on stdin/stdout.
#[derive(Debug, Default)]
pub struct StdioPrompt;

impl SetupPrompt for StdioPrompt {
    fn say(&mut self, text: &str) {
        println!("{}", text);
    }

    fn ask(&mut self, question: &str) -> Option<String> {
        print!("{}", question);
        io::stdout().flush().ok()?;
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim_end_matches(['\r', '\n']).to_string()),
        }
    }
}

/// Prompt answering from a fixed script; keeps a transcript of everything
/// said and asked.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<String>,
    pub transcript: Vec<String>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            transcript: Vec::new(),
        }
    }
}

impl SetupPrompt for ScriptedPrompt {
    fn say(&mut self, text: &str) {
        self.transcript.push(text.to_string());
    }

    fn ask(&mut self, question: &str) -> Option<String> {
        self.transcript.push(question.to_string());
        self.answers.pop_front()
    }
}

/// A credential the operator is asked for.
#[derive(Debug, Clone, Copy)]
pub struct CredentialField {
    /// Credential store key.
    pub key: &'static str,
    pub question: &'static str,
}

/// Description of one connection's setup dialogue.
#[derive(Debug, Clone, Copy)]
pub struct GuidedSetup<'a> {
    pub title: &'a str,
    pub instructions: &'a [&'a str],
    pub fields: &'a [CredentialField],
}

impl GuidedSetup<'_> {
    /// Run the dialogue. Returns `true` when a working credential is in
    /// place afterwards. Failures are logged, never returned.
    pub fn run<F>(
        &self,
        prompt: &mut dyn SetupPrompt,
        store: &dyn CredentialStore,
        already_configured: bool,
        verify: F,
    ) -> bool
    where
        F: FnOnce(&HashMap<&'static str, String>) -> Result<()>,
    {
        prompt.say(&format!("\n{} SETUP", self.title.to_uppercase()));

        if already_configured {
            prompt.say(&format!("\n{} is already configured.", self.title));
            let answer = prompt.ask("Do you want to reconfigure? (y/n): ");
            if !answer.map_or(false, |a| a.trim().eq_ignore_ascii_case("y")) {
                return true;
            }
        }

        for line in self.instructions {
            prompt.say(line);
        }

        let mut values = HashMap::new();
        for field in self.fields {
            match prompt.ask(field.question) {
                Some(value) if !value.trim().is_empty() => {
                    values.insert(field.key, value.trim().to_string());
                }
                _ => {
                    log::error!("Configuration failed: no value entered for {}", field.key);
                    return false;
                }
            }
        }

        if let Err(e) = verify(&values) {
            log::error!("Configuration failed: {}", e);
            return false;
        }

        let entries: Vec<(&str, &str)> = self
            .fields
            .iter()
            .map(|field| (field.key, values[field.key].as_str()))
            .collect();
        if let Err(e) = store.set_many(&entries) {
            log::error!("Configuration failed: {}", e);
            return false;
        }

        prompt.say(&format!("\n{} configuration successfully saved!", self.title));
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;
    use crate::error::ConnectionError;

    const SETUP: GuidedSetup<'static> = GuidedSetup {
        title: "Example API",
        instructions: &["1. Create a token"],
        fields: &[CredentialField {
            key: "EXAMPLE_TOKEN",
            question: "Enter your token: ",
        }],
    };

    #[test]
    fn test_keeps_existing_credential_unless_confirmed() {
        let store = MemoryCredentialStore::new();
        let mut prompt = ScriptedPrompt::new(["n"]);
        let ok = SETUP.run(&mut prompt, &store, true, |_| panic!("must not verify"));
        assert!(ok);
        assert_eq!(store.get("EXAMPLE_TOKEN"), None);
    }

    #[test]
    fn test_verifies_before_persisting() {
        let store = MemoryCredentialStore::new();
        let mut prompt = ScriptedPrompt::new(["bad-token"]);
        let ok = SETUP.run(&mut prompt, &store, false, |values| {
            assert_eq!(values["EXAMPLE_TOKEN"], "bad-token");
            Err(ConnectionError::platform(401, "Unauthorized"))
        });
        assert!(!ok);
        assert_eq!(store.get("EXAMPLE_TOKEN"), None);
    }

    #[test]
    fn test_reconfigure_saves_new_credential() {
        let store = MemoryCredentialStore::new().with("EXAMPLE_TOKEN", "old");
        let mut prompt = ScriptedPrompt::new(["Y", "  new-token  "]);
        let ok = SETUP.run(&mut prompt, &store, true, |_| Ok(()));
        assert!(ok);
        assert_eq!(store.get("EXAMPLE_TOKEN").as_deref(), Some("new-token"));
        assert!(prompt.transcript.iter().any(|l| l.contains("successfully saved")));
    }

    const TWO_FIELDS: GuidedSetup<'static> = GuidedSetup {
        title: "Example API",
        instructions: &[],
        fields: &[
            CredentialField {
                key: "EXAMPLE_KEY",
                question: "Key: ",
            },
            CredentialField {
                key: "EXAMPLE_URL",
                question: "URL: ",
            },
        ],
    };

    /// Store whose writes to `EXAMPLE_URL` always fail.
    struct BrokenUrlStore(MemoryCredentialStore);

    impl CredentialStore for BrokenUrlStore {
        fn get(&self, key: &str) -> Option<String> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            if key == "EXAMPLE_URL" {
                return Err(ConnectionError::Credential("disk full".to_string()));
            }
            self.0.set(key, value)
        }
    }

    #[test]
    fn test_failed_save_keeps_previous_credentials_together() {
        let store = BrokenUrlStore(
            MemoryCredentialStore::new()
                .with("EXAMPLE_KEY", "old-key")
                .with("EXAMPLE_URL", "https://old"),
        );
        let mut prompt = ScriptedPrompt::new(["new-key", "https://new"]);

        assert!(!TWO_FIELDS.run(&mut prompt, &store, false, |_| Ok(())));
        assert_eq!(store.get("EXAMPLE_KEY").as_deref(), Some("old-key"));
        assert_eq!(store.get("EXAMPLE_URL").as_deref(), Some("https://old"));
    }

    #[test]
    fn test_saves_every_field() {
        let store = MemoryCredentialStore::new();
        let mut prompt = ScriptedPrompt::new(["k", "https://u"]);

        assert!(TWO_FIELDS.run(&mut prompt, &store, false, |values| {
            assert_eq!(values.len(), 2);
            Ok(())
        }));
        assert_eq!(store.get("EXAMPLE_KEY").as_deref(), Some("k"));
        assert_eq!(store.get("EXAMPLE_URL").as_deref(), Some("https://u"));
    }

    #[test]
    fn test_missing_answer_fails() {
        let store = MemoryCredentialStore::new();
        let mut prompt = ScriptedPrompt::new(Vec::<String>::new());
        assert!(!SETUP.run(&mut prompt, &store, false, |_| Ok(())));
    }
}

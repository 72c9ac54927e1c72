use std::io::{self, BufRead, Write};

/// Asks the operator to approve a destructive step.
pub trait Confirm {
    /// Show `question` and return the raw answer, without the line ending.
    fn ask(&mut self, question: &str) -> io::Result<String>;

    /// Only an exact `Y` counts as consent.
    fn confirm(&mut self, question: &str) -> io::Result<bool> {
        Ok(self.ask(question)?.trim_end_matches(['\r', '\n']) == "Y")
    }
}

pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        print!("{} [Y/n] ", question);
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().lock().read_line(&mut answer)?;
        Ok(answer)
    }
}

/// `--yes`
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn ask(&mut self, question: &str) -> io::Result<String> {
        log::info!("{} [assumed Y]", question);
        Ok("Y".to_string())
    }
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> String,
{
    fn ask(&mut self, question: &str) -> io::Result<String> {
        Ok(self(question))
    }
}

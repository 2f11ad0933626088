//! Line-oriented form renderer.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use chrono::NaiveDate;

use formscout_core::{FieldValue, FormPrompt, UserInputRecord, WidgetKind};

/// Extensions accepted by file widgets.
const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Asks for one value per prompt and assembles the submitted record.
pub struct PromptRenderer<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> PromptRenderer<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Collect values for every prompt, then ask for confirmation.
    ///
    /// Returns `None` when the user declines to submit.
    pub fn collect(&mut self, prompts: &[FormPrompt]) -> anyhow::Result<Option<UserInputRecord>> {
        let mut record = UserInputRecord::new();

        for prompt in prompts {
            let value = match prompt.kind {
                WidgetKind::Text => self.ask_text(prompt)?,
                WidgetKind::Date => self.ask_date(prompt)?,
                WidgetKind::File => self.ask_file(prompt)?,
            };
            record.set(prompt.label.clone(), value);
        }

        if self.confirm()? {
            Ok(Some(record))
        } else {
            writeln!(self.output, "Submission cancelled.")?;
            Ok(None)
        }
    }

    /// `None` at end of input.
    fn read_line(&mut self, question: &str) -> anyhow::Result<Option<String>> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn ask_text(&mut self, prompt: &FormPrompt) -> anyhow::Result<FieldValue> {
        let question = format!("{}: ", prompt.label);
        Ok(match self.read_line(&question)? {
            Some(text) => FieldValue::Text(text),
            None => FieldValue::Null,
        })
    }

    fn ask_date(&mut self, prompt: &FormPrompt) -> anyhow::Result<FieldValue> {
        let question = format!("{} (YYYY-MM-DD, blank to skip): ", prompt.label);
        loop {
            let Some(answer) = self.read_line(&question)? else {
                return Ok(FieldValue::Null);
            };
            if answer.is_empty() {
                return Ok(FieldValue::Null);
            }
            match NaiveDate::parse_from_str(&answer, "%Y-%m-%d") {
                Ok(date) => return Ok(FieldValue::Date(date)),
                Err(_) => writeln!(self.output, "  Not a valid date: {}", answer)?,
            }
        }
    }

    fn ask_file(&mut self, prompt: &FormPrompt) -> anyhow::Result<FieldValue> {
        let question = format!(
            "{} (path to {} file, blank to skip): ",
            prompt.label,
            IMAGE_EXTENSIONS.join("/")
        );
        loop {
            let Some(answer) = self.read_line(&question)? else {
                return Ok(FieldValue::Null);
            };
            if answer.is_empty() {
                return Ok(FieldValue::Null);
            }

            let path = PathBuf::from(&answer);
            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_lowercase();

            if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
                writeln!(self.output, "  Unsupported file type: {}", answer)?;
            } else if !path.is_file() {
                writeln!(self.output, "  File not found: {}", answer)?;
            } else {
                return Ok(FieldValue::File(path));
            }
        }
    }

    fn confirm(&mut self) -> anyhow::Result<bool> {
        loop {
            let Some(answer) = self.read_line("Submit? [Y/n]: ")? else {
                return Ok(true);
            };
            match answer.to_lowercase().as_str() {
                "" | "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => writeln!(self.output, "  Please answer y or n.")?,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use formscout_core::FieldLabel;
    use pretty_assertions::assert_eq;

    fn prompt(label: &str, kind: WidgetKind) -> FormPrompt {
        FormPrompt {
            label: FieldLabel::normalize(label).unwrap(),
            kind,
        }
    }

    fn run(prompts: &[FormPrompt], input: &str) -> (Option<UserInputRecord>, String) {
        let mut output = Vec::new();
        let record = PromptRenderer::new(input.as_bytes(), &mut output)
            .collect(prompts)
            .unwrap();
        (record, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_collects_text_and_date() {
        let prompts = [
            prompt("full name", WidgetKind::Text),
            prompt("date of birth", WidgetKind::Date),
        ];
        let (record, output) = run(&prompts, "Ayesha Khan\n1994-07-02\ny\n");

        let record = record.unwrap();
        assert_eq!(
            record.get("Full Name"),
            Some(&FieldValue::Text("Ayesha Khan".to_string()))
        );
        assert_eq!(
            record.get("Date Of Birth"),
            Some(&FieldValue::Date(NaiveDate::from_ymd_opt(1994, 7, 2).unwrap()))
        );
        assert!(output.contains("Full Name: "));
        assert!(output.contains("Date Of Birth (YYYY-MM-DD, blank to skip): "));
    }

    #[test]
    fn test_invalid_date_reprompts() {
        let prompts = [prompt("issue date", WidgetKind::Date)];
        let (record, output) = run(&prompts, "02/07/1994\n1994-07-02\n\n");

        assert!(output.contains("Not a valid date: 02/07/1994"));
        assert_eq!(
            record.unwrap().get("Issue Date"),
            Some(&FieldValue::Date(NaiveDate::from_ymd_opt(1994, 7, 2).unwrap()))
        );
    }

    #[test]
    fn test_blank_date_and_file_are_null() {
        let prompts = [
            prompt("date", WidgetKind::Date),
            prompt("photo", WidgetKind::File),
        ];
        let (record, _) = run(&prompts, "\n\nyes\n");

        let record = record.unwrap();
        assert_eq!(record.get("Date"), Some(&FieldValue::Null));
        assert_eq!(record.get("Photo"), Some(&FieldValue::Null));
    }

    #[test]
    fn test_file_must_exist_with_image_extension() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("me.PNG");
        std::fs::write(&photo, b"png").unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, b"txt").unwrap();
        let missing = dir.path().join("missing.jpg");

        let input = format!(
            "{}\n{}\n{}\n\n",
            notes.display(),
            missing.display(),
            photo.display()
        );
        let (record, output) = run(&[prompt("photo", WidgetKind::File)], &input);

        assert!(output.contains("Unsupported file type"));
        assert!(output.contains("File not found"));
        assert_eq!(record.unwrap().get("Photo"), Some(&FieldValue::File(photo)));
    }

    #[test]
    fn test_declined_submission() {
        let (record, output) = run(&[prompt("name", WidgetKind::Text)], "Ali\nmaybe\nn\n");

        assert_eq!(record, None);
        assert!(output.contains("Please answer y or n."));
        assert!(output.contains("Submission cancelled."));
    }

    #[test]
    fn test_end_of_input_fills_nulls_and_submits() {
        let prompts = [
            prompt("name", WidgetKind::Text),
            prompt("city", WidgetKind::Text),
        ];
        let (record, _) = run(&prompts, "Lahore");

        let record = record.unwrap();
        assert_eq!(record.get("Name"), Some(&FieldValue::Text("Lahore".to_string())));
        assert_eq!(record.get("City"), Some(&FieldValue::Null));
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"Name":"Lahore","City":null}"#
        );
    }
}

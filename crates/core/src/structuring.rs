//! Turning transcripts into structured notes.
//!
//! A [`StructuringClient`] sends a transcript to whatever produces the structured JSON (usually
//! a language model) and returns its raw text. [`StructuringService`] picks the format, retries
//! once with the basic request when the first one fails, and normalises whatever comes back.

use crate::config::CoreConfig;
use crate::{NoteError, NoteResult};
use medical_sections::{parse_structuring_response, DocumentFormat, MedicalSections};
use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;

/// Source of raw structuring responses.
pub trait StructuringClient: Send + Sync {
    /// Requests a structured note in `format`. Errors are human-readable descriptions.
    fn structure(&self, transcript: &str, format: DocumentFormat) -> Result<String, String>;

    /// The simplest request the client supports, used as a retry after a failure.
    fn structure_basic(&self, transcript: &str) -> Result<String, String> {
        self.structure(transcript, DocumentFormat::Standard)
    }
}

/// Builds the instruction text sent ahead of a transcript.
pub fn structuring_prompt(format: DocumentFormat, transcript: &str) -> String {
    let keys = match format {
        DocumentFormat::Standard => {
            "chiefComplaint, historyOfPresentIllness, pastMedicalHistory, medications, \
             allergies, physicalExamination, assessment, plan"
        }
        DocumentFormat::Soap => "subjective, objective, assessment, plan",
        DocumentFormat::Consultation => {
            "reasonForConsultation, history, findings, impression, recommendations"
        }
        DocumentFormat::Prescription => {
            "patientInformation {name, sex, age, date}, medications [{genericName, brandName, \
             strength, dosageForm, sigInstructions, quantity, refills, specialInstructions}], \
             prescriberInformation {name, licenseNumber, s2Number, ptrNumber}"
        }
    };

    format!(
        "Structure the following clinical transcript as a {} note. \
         Respond with a single JSON object with the keys: {}. \
         Use empty strings for anything not mentioned.\n\nTranscript:\n{}",
        format, keys, transcript
    )
}

/// Runs an external program per request: the prompt is written to its stdin and its stdout is
/// taken as the response.
#[derive(Clone, Debug)]
pub struct CommandClient {
    program: String,
    args: Vec<String>,
}

impl CommandClient {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl StructuringClient for CommandClient {
    fn structure(&self, transcript: &str, format: DocumentFormat) -> Result<String, String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env("SCRIBE_FORMAT", format.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| format!("failed to start {}: {}", self.program, e))?;

        // The prompt is written on its own thread so a child that echoes
        // while reading cannot fill stdout and stall both sides.
        let writer = child.stdin.take().map(|mut stdin| {
            let prompt = structuring_prompt(format, transcript);
            thread::spawn(move || stdin.write_all(prompt.as_bytes()))
        });

        let output = child
            .wait_with_output()
            .map_err(|e| format!("failed to wait for {}: {}", self.program, e))?;

        let written = match writer {
            Some(handle) => handle
                .join()
                .map_err(|_| "transcript writer panicked".to_string())?,
            None => Ok(()),
        };

        if !output.status.success() {
            return Err(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        written.map_err(|e| format!("failed to send transcript: {}", e))?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Structures transcripts through a client and normalises the result.
#[derive(Clone)]
pub struct StructuringService {
    cfg: Arc<CoreConfig>,
    client: Arc<dyn StructuringClient>,
}

impl StructuringService {
    pub fn new(cfg: Arc<CoreConfig>, client: Arc<dyn StructuringClient>) -> Self {
        Self { cfg, client }
    }

    /// Structures `transcript`, using `role` as the format hint when it names a format.
    ///
    /// A response to the basic retry is read as a standard note.
    ///
    /// # Errors
    ///
    /// - [`NoteError::InvalidInput`] if the transcript is blank
    /// - [`NoteError::Upstream`] if both the requested and the basic request fail
    pub fn structure_transcript(
        &self,
        transcript: &str,
        role: Option<&str>,
    ) -> NoteResult<MedicalSections> {
        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Err(NoteError::InvalidInput("transcript cannot be empty".into()));
        }

        let format = role
            .and_then(DocumentFormat::from_hint)
            .unwrap_or_else(|| self.cfg.default_format());

        let (response, answered) = match self.client.structure(transcript, format) {
            Ok(response) => (response, format),
            Err(first) => {
                tracing::warn!(
                    %format,
                    "structuring failed, retrying with basic request: {}",
                    first
                );
                let response = self.client.structure_basic(transcript).map_err(|second| {
                    NoteError::Upstream(format!("{}; retry: {}", first, second))
                })?;
                (response, DocumentFormat::Standard)
            }
        };

        Ok(parse_structuring_response(&response, Some(answered.as_str())))
    }
}

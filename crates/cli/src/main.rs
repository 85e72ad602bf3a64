use clap::{Parser, Subcommand};
use medical_sections::{
    detect_format, empty_structure, fallback_structure, normalize_structured_data,
    parse_complex_medication_string, render_plain_text, DocumentFormat, MedicalSections,
};
use scribe_core::{
    default_format_from_env_value, CommandClient, CoreConfig, NoteService, SavedNote,
    StructuringService, DEFAULT_DATA_DIR,
};
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "scribe")]
#[command(about = "Clinical scribe note normalisation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalise structured data into a canonical record
    Normalize {
        /// JSON or text file, or `-` for stdin
        input: String,
        /// Format hint (standard, history, soap, consultation, prescription)
        #[arg(long)]
        role: Option<String>,
    },
    /// Print the detected format of structured data
    Detect {
        /// JSON or text file, or `-` for stdin
        input: String,
        #[arg(long)]
        role: Option<String>,
    },
    /// Split a medication string into generic, brand and strength
    ParseMedication {
        /// e.g. "Aspirin (aspilets) 80mg"
        text: String,
    },
    /// Print the empty record for a format
    Empty {
        format: String,
    },
    /// Normalise structured data and print it as plain text
    Export {
        /// JSON or text file, or `-` for stdin
        input: String,
        #[arg(long)]
        role: Option<String>,
    },
    /// Print the fallback record for free text
    Fallback {
        text: String,
    },
    /// Structure a transcript by piping it through an external program
    Structure {
        /// Transcript file, or `-` for stdin
        input: String,
        #[arg(long)]
        role: Option<String>,
        /// Program (plus arguments) that reads a prompt on stdin and writes JSON to stdout
        #[arg(long)]
        command: String,
    },
    /// List saved notes
    List {
        /// Only list notes owned by this user
        #[arg(long)]
        user: Option<String>,
    },
    /// Print a saved note
    Show {
        /// Note id
        id: String,
    },
    /// Normalise structured data and save it as a note
    Save {
        /// JSON or text file, or `-` for stdin
        input: String,
        /// Owner of the note
        #[arg(long)]
        user: String,
        /// Note title
        #[arg(long)]
        title: String,
        #[arg(long)]
        role: Option<String>,
    },
    /// Delete a saved note
    Delete {
        /// Note id
        id: String,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Option<Commands>) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Some(Commands::Normalize { input, role }) => {
            let raw = read_input(&input)?;
            print_sections(&normalize_structured_data(&raw, role.as_deref()))?;
        }
        Some(Commands::Detect { input, role }) => {
            let raw = read_input(&input)?;
            println!("{}", detect_format(&raw, role.as_deref()));
        }
        Some(Commands::ParseMedication { text }) => {
            let parsed = parse_complex_medication_string(&text);
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }
        Some(Commands::Empty { format }) => {
            let format: DocumentFormat = format.parse()?;
            print_sections(&empty_structure(format))?;
        }
        Some(Commands::Export { input, role }) => {
            let raw = read_input(&input)?;
            println!(
                "{}",
                render_plain_text(&normalize_structured_data(&raw, role.as_deref()))
            );
        }
        Some(Commands::Fallback { text }) => {
            print_sections(&fallback_structure(&text))?;
        }
        Some(Commands::Structure {
            input,
            role,
            command,
        }) => {
            let transcript = read_text(&input)?;
            let mut parts = command.split_whitespace().map(str::to_string);
            let Some(program) = parts.next() else {
                return Err("--command cannot be empty".into());
            };
            let client = CommandClient::new(program, parts.collect());
            let service = StructuringService::new(config()?, Arc::new(client));
            let sections = service
                .structure_transcript(&transcript, role.as_deref())
                .map_err(|e| format!("Error structuring transcript: {}", e))?;
            print_sections(&sections)?;
        }
        Some(Commands::List { user }) => {
            let notes = NoteService::new(config()?).list(user.as_deref());
            if notes.is_empty() {
                println!("No notes found.");
            } else {
                for note in notes {
                    println!(
                        "ID: {}, Title: {}, Format: {}, User: {}, Updated: {}",
                        note.id,
                        note.title,
                        note.format,
                        note.user_id,
                        note.updated_at.to_rfc3339()
                    );
                }
            }
        }
        Some(Commands::Show { id }) => {
            let note = NoteService::new(config()?)
                .read(&id)
                .map_err(|e| format!("Error reading note: {}", e))?;
            println!("{}", serde_json::to_string_pretty(&note)?);
        }
        Some(Commands::Save {
            input,
            user,
            title,
            role,
        }) => {
            let raw = read_input(&input)?;
            let saved = save_note(&NoteService::new(config()?), &raw, &user, &title, role)?;
            for warning in &saved.warnings {
                eprintln!("Warning: {}", warning);
            }
            println!("Saved note with ID: {}", saved.note.id);
        }
        Some(Commands::Delete { id }) => {
            NoteService::new(config()?)
                .delete(&id)
                .map_err(|e| format!("Error deleting note: {}", e))?;
            println!("Deleted note: {}", id);
        }
        None => {
            println!("Use 'scribe --help' for commands");
        }
    }

    Ok(())
}

fn save_note(
    service: &NoteService,
    raw: &Value,
    user: &str,
    title: &str,
    role: Option<String>,
) -> Result<SavedNote, String> {
    let content = normalize_structured_data(raw, role.as_deref());
    service
        .create(user, title, content)
        .map_err(|e| format!("Error saving note: {}", e))
}

fn config() -> Result<Arc<CoreConfig>, Box<dyn std::error::Error>> {
    let data_dir = std::env::var("SCRIBE_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());
    let default_format =
        default_format_from_env_value(std::env::var("SCRIBE_DEFAULT_FORMAT").ok())?;
    Ok(Arc::new(CoreConfig::new(PathBuf::from(data_dir), default_format)?))
}

fn read_text(input: &str) -> std::io::Result<String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        std::fs::read_to_string(input)
    }
}

fn read_input(input: &str) -> std::io::Result<Value> {
    Ok(parse_input(&read_text(input)?))
}

/// JSON input is used as-is; anything else is treated as free text.
fn parse_input(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn print_sections(sections: &MedicalSections) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(sections)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_input_accepts_json_and_text() {
        assert_eq!(parse_input(r#"{"plan": "rest"}"#), json!({ "plan": "rest" }));
        assert_eq!(
            parse_input("patient is well"),
            Value::String("patient is well".into())
        );
    }

    fn note_service(dir: &TempDir) -> NoteService {
        let cfg = CoreConfig::new(dir.path().to_path_buf(), DocumentFormat::Standard).unwrap();
        NoteService::new(Arc::new(cfg))
    }

    #[test]
    fn save_note_reports_rejected_input() {
        let dir = TempDir::new().unwrap();
        let err = save_note(&note_service(&dir), &json!({ "plan": "rest" }), " ", "Rx", None)
            .expect_err("blank user");
        assert!(err.starts_with("Error saving note:"), "{}", err);
    }

    #[test]
    fn save_note_stores_normalised_content() {
        let dir = TempDir::new().unwrap();
        let service = note_service(&dir);
        let raw = json!({ "subjective": "cough", "objective": "clear" });
        let saved = save_note(&service, &raw, "dr-cruz", "Visit", None).unwrap();
        assert_eq!(saved.note.format, DocumentFormat::Soap);
        assert_eq!(service.list(Some("dr-cruz")).len(), 1);
    }

    #[test]
    fn save_requires_user_and_title() {
        assert!(Cli::try_parse_from(["scribe", "save", "note.json"]).is_err());
        assert!(Cli::try_parse_from([
            "scribe", "save", "note.json", "--user", "dr-cruz", "--title", "Rx"
        ])
        .is_ok());
    }
}

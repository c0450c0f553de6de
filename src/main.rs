use lembar::{Connection, QueryResult, ResultSet};
use rustyline::{DefaultEditor, Result, error::ReadlineError};
use tracing_subscriber::EnvFilter;

const HISTORY_FILE: &str = ".lembar_history";
const DEFAULT_DB_PATH: &str = "lembar.db";

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn read_multiline_command(rl: &mut DefaultEditor) -> Result<String> {
    let mut input = String::new();
    let mut prompt = "lembar> ";

    loop {
        let line = rl.readline(prompt)?;
        let trimmed_line = line.trim_end();

        // Trailing backslash continues the statement on the next line
        if let Some(continued) = trimmed_line.strip_suffix('\\') {
            input.push_str(continued);
            input.push(' ');
            prompt = "    ...> ";
        } else {
            input.push_str(trimmed_line);
            break;
        }
    }

    Ok(input)
}

fn print_result_set(result_set: &ResultSet) {
    let mut widths: Vec<usize> = result_set.columns.iter().map(|c| c.len()).collect();
    let rendered: Vec<Vec<String>> = result_set
        .rows
        .iter()
        .map(|row| row.iter().map(|value| value.to_string()).collect())
        .collect();
    for row in &rendered {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    println!("{}", line(&result_set.columns));
    println!(
        "{}",
        widths
            .iter()
            .map(|width| "-".repeat(*width))
            .collect::<Vec<_>>()
            .join("-+-")
    );
    for row in &rendered {
        println!("{}", line(row));
    }
    println!("({} rows)", result_set.len());
}

/// Returns false when the shell should exit.
fn process_command(connection: &mut Connection, command: &str) -> bool {
    let cmd = command.trim();

    match cmd.to_lowercase().as_str() {
        "exit" | "quit" | ".exit" | ".quit" => return false,
        ".help" => {
            println!(
                r#"
Meta commands:
  .tables       - List tables
  .checkpoint   - Write the log back into the database file
  .help         - Show this help message
  exit          - Leave the shell

Statements: CREATE TABLE, DROP TABLE, INSERT, SELECT, DELETE.
Separate several statements with ';'. End a line with '\' to continue it.
"#
            );
        }
        ".tables" => match connection.table_names() {
            Ok(names) => println!("{}", names.join("  ")),
            Err(e) => eprintln!("Error: {}", e),
        },
        ".checkpoint" => match connection.checkpoint() {
            Ok(frames) => println!("Checkpointed {} frames", frames),
            Err(e) => eprintln!("Error: {}", e),
        },
        "" => {}
        _ => match connection.execute_batch(cmd) {
            Ok(results) => {
                for result in results {
                    match result {
                        QueryResult::Rows(result_set) => print_result_set(&result_set),
                        QueryResult::RowsAffected(count) => println!("OK ({} rows affected)", count),
                    }
                }
            }
            Err(e) => eprintln!("Error: {}", e),
        },
    }

    true
}

fn main() -> Result<()> {
    init_logging();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
    let mut connection = match Connection::open_path(&path) {
        Ok(connection) => connection,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };
    println!("lembar {} - connected to {}", env!("CARGO_PKG_VERSION"), path);
    println!("Enter .help for usage hints.");

    let mut rl = DefaultEditor::new()?;
    let _ = rl.load_history(HISTORY_FILE);

    loop {
        match read_multiline_command(&mut rl) {
            Ok(input) => {
                let command = input.trim().to_string();
                if command.is_empty() {
                    continue;
                }
                rl.add_history_entry(&command)?;
                if !process_command(&mut connection, &command) {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("Error: {:?}", err);
                break;
            }
        }
    }

    let _ = rl.save_history(HISTORY_FILE);
    connection.close();
    Ok(())
}

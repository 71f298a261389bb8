use std::path::PathBuf;

use clap::Subcommand;

use super::{open_store, print_json};

#[derive(Subcommand)]
pub enum DataAction {
    /// Export all records and tags as JSON
    Export {
        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Replace all records and tags with an exported JSON file
    Import {
        /// Exported JSON file
        file: PathBuf,
    },
}

pub fn run(action: DataAction) -> Result<(), Box<dyn std::error::Error>> {
    let (_, mut store) = open_store();

    match action {
        DataAction::Export { output } => {
            let json = store.export_json()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    eprintln!("exported to {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        DataAction::Import { file } => {
            let json = std::fs::read_to_string(&file)?;
            let summary = store.import_json(&json)?;
            print_json(&summary)?;
        }
    }
    Ok(())
}

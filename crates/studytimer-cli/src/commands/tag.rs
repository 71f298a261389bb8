use clap::Subcommand;
use serde_json::json;

use super::{open_store, print_json};

#[derive(Subcommand)]
pub enum TagAction {
    /// List tags and the current selection
    List,
    /// Add a tag
    Add {
        /// Tag name
        name: String,
    },
    /// Delete a tag (clears the selection if it was selected)
    Delete {
        /// Tag name
        name: String,
    },
    /// Select the tag new sessions are recorded under
    Select {
        /// Tag name
        name: String,
    },
    /// Clear the selected tag
    Clear,
}

pub fn run(action: TagAction) -> Result<(), Box<dyn std::error::Error>> {
    let (_, mut store) = open_store();

    match action {
        TagAction::List => {
            let tags = store.tags()?;
            let selected = store.selected_tag()?;
            print_json(&json!({ "tags": tags, "selected": selected }))?;
        }
        TagAction::Add { name } => {
            if store.add_tag(&name)? {
                println!("tag added: {}", name.trim());
            } else {
                return Err(format!("tag already exists: {}", name.trim()).into());
            }
        }
        TagAction::Delete { name } => {
            if store.delete_tag(&name)? {
                println!("tag deleted: {}", name.trim());
            } else {
                return Err(format!("tag not found: {}", name.trim()).into());
            }
        }
        TagAction::Select { name } => {
            let name = name.trim();
            if !store.tags()?.iter().any(|t| t == name) {
                return Err(format!("tag not found: {name}").into());
            }
            store.set_selected_tag(Some(name))?;
            println!("selected: {name}");
        }
        TagAction::Clear => {
            store.set_selected_tag(None)?;
            println!("selection cleared");
        }
    }
    Ok(())
}

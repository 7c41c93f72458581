use crate::cli::actions::{pay, Action};
use anyhow::Result;

/// Execute the provided action.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Pay(args) => pay::execute(args).await,
    }
}

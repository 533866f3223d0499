pub mod assist;
pub mod categories;
pub mod expenses;
pub mod init;
pub mod users;

use clap::{ArgAction, Parser, Subcommand};

use crate::ai::{Assistant, CategoryClassifier, FsModelStore};
use crate::error::Result;
use crate::settings::load_settings;
use crate::store::SqliteStore;

pub(crate) fn open_store() -> Result<SqliteStore> {
    let settings = load_settings();
    std::fs::create_dir_all(settings.data_path())?;
    SqliteStore::open(&settings.db_path())
}

pub(crate) fn assistant() -> Assistant<FsModelStore> {
    let store = FsModelStore::new(load_settings().model_dir());
    Assistant::new(CategoryClassifier::new(store))
}

#[derive(Parser)]
#[command(name = "buddy", about = "Budget tracking with a transaction categorization assistant.")]
pub struct Cli {
    /// Increase log output (-v info, -vv debug). BUDDY_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for budget data (default: platform data dir)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Manage users.
    Users {
        #[command(subcommand)]
        command: UsersCommands,
    },
    /// Record and edit transactions.
    Expenses {
        #[command(subcommand)]
        command: ExpensesCommands,
    },
    /// Manage budget categories.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Train the category model on every user's transactions.
    Train,
    /// Predict a category for a transaction.
    Predict {
        #[arg(long)]
        amount: Option<f64>,
        /// Date: YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Turn a spoken or typed sentence into a transaction draft.
    Voice {
        /// The sentence, e.g. "Spent $12 on lunch"
        text: String,
        /// Save the draft as an expense for this user
        #[arg(long)]
        user: Option<String>,
        /// Store the draft (requires --user)
        #[arg(long, requires = "user")]
        save: bool,
        /// Print the draft as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show spending insights for a user.
    Insights {
        user: String,
        /// Print insights as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum UsersCommands {
    /// Register a user id issued by the identity provider.
    Register {
        id: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "")]
        name: String,
        /// Starting budget (default from settings)
        #[arg(long)]
        budget: Option<f64>,
    },
    /// Show a user's budget, categories, and recent transactions.
    Show { id: String },
    /// Change a user's overall budget.
    Budget { id: String, amount: f64 },
}

#[derive(Subcommand)]
pub enum ExpensesCommands {
    /// Add a transaction.
    Add {
        user: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        category: String,
        /// Date: YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
        /// Record as income instead of an expense
        #[arg(long)]
        income: bool,
        /// Transaction id (default: random)
        #[arg(long)]
        id: Option<String>,
    },
    /// List a user's transactions.
    List { user: String },
    /// Change fields of a transaction.
    Update {
        user: String,
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        date: Option<String>,
        /// true for an expense, false for income
        #[arg(long)]
        expense: Option<bool>,
    },
    /// Delete a transaction.
    Delete { user: String, id: String },
    /// Show the model's category next to each recorded one.
    Suggest { user: String },
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// Add a budget category.
    Add {
        user: String,
        name: String,
        #[arg(long)]
        allocated: f64,
        #[arg(long, default_value = "monthly")]
        period: String,
        #[arg(long, default_value = "#64748B")]
        color: String,
        #[arg(long, default_value = "pricetag")]
        icon: String,
        /// Category id (default: random)
        #[arg(long)]
        id: Option<String>,
    },
    /// List a user's categories with spent and remaining amounts.
    List { user: String },
    /// Change fields of a category; remaining is recomputed.
    Update {
        user: String,
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        allocated: Option<f64>,
        #[arg(long)]
        spent: Option<f64>,
        #[arg(long)]
        period: Option<String>,
        #[arg(long)]
        color: Option<String>,
        #[arg(long)]
        icon: Option<String>,
    },
    /// Delete a category.
    Delete { user: String, id: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn save_requires_user() {
        assert!(Cli::try_parse_from(["buddy", "voice", "lunch 12", "--save"]).is_err());
        let saved = ["buddy", "voice", "lunch 12", "--save", "--user", "u1"];
        assert!(Cli::try_parse_from(saved).is_ok());
    }

    #[test]
    fn verbose_is_counted() {
        let cli = Cli::try_parse_from(["buddy", "-vv", "train"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}

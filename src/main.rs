mod ai;
mod cli;
mod db;
mod error;
mod fmt;
mod logging;
mod models;
mod settings;
mod store;

use clap::Parser;

use cli::categories::{CategoryChanges, NewCategory};
use cli::expenses::{ExpenseChanges, NewExpense};
use cli::{CategoriesCommands, Cli, Commands, ExpensesCommands, UsersCommands};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Users { command } => match command {
            UsersCommands::Register {
                id,
                email,
                name,
                budget,
            } => cli::users::register(&id, &email, &name, budget),
            UsersCommands::Show { id } => cli::users::show(&id),
            UsersCommands::Budget { id, amount } => cli::users::set_budget(&id, amount),
        },
        Commands::Expenses { command } => match command {
            ExpensesCommands::Add {
                user,
                title,
                amount,
                category,
                date,
                income,
                id,
            } => cli::expenses::add(
                &user,
                NewExpense {
                    title: &title,
                    amount,
                    category: &category,
                    date: date.as_deref(),
                    income,
                    id: id.as_deref(),
                },
            ),
            ExpensesCommands::List { user } => cli::expenses::list(&user),
            ExpensesCommands::Update {
                user,
                id,
                title,
                amount,
                category,
                date,
                expense,
            } => cli::expenses::update(
                &user,
                &id,
                ExpenseChanges {
                    title,
                    amount,
                    category,
                    date,
                    expense,
                },
            ),
            ExpensesCommands::Delete { user, id } => cli::expenses::delete(&user, &id),
            ExpensesCommands::Suggest { user } => cli::assist::suggest(&user),
        },
        Commands::Categories { command } => match command {
            CategoriesCommands::Add {
                user,
                name,
                allocated,
                period,
                color,
                icon,
                id,
            } => cli::categories::add(
                &user,
                NewCategory {
                    name: &name,
                    allocated,
                    period: &period,
                    color: &color,
                    icon: &icon,
                    id: id.as_deref(),
                },
            ),
            CategoriesCommands::List { user } => cli::categories::list(&user),
            CategoriesCommands::Update {
                user,
                id,
                name,
                allocated,
                spent,
                period,
                color,
                icon,
            } => cli::categories::update(
                &user,
                &id,
                CategoryChanges {
                    name,
                    allocated,
                    spent,
                    period,
                    color,
                    icon,
                },
            ),
            CategoriesCommands::Delete { user, id } => cli::categories::delete(&user, &id),
        },
        Commands::Train => cli::assist::train(),
        Commands::Predict {
            amount,
            date,
            description,
        } => cli::assist::predict(amount, date.as_deref(), description),
        Commands::Voice {
            text,
            user,
            save,
            json,
        } => cli::assist::voice(&text, user.as_deref(), save, json),
        Commands::Insights { user, json } => cli::assist::insights(&user, json),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

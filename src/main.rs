mod cli;

use clap::Parser;

use cli::{Cli, Commands, EntityCommands, RecordCommands, RentCommands};

fn main() {
    ficore::init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init { data_dir } => cli::init::run(data_dir),
        Commands::Record { command } => match command {
            RecordCommands::Receipt {
                taxpayer,
                amount,
                year,
                description,
            } => cli::record::receipt(&taxpayer, &amount, year, description.as_deref()),
            RecordCommands::Payment {
                taxpayer,
                category,
                amount,
                year,
                description,
            } => cli::record::payment(&taxpayer, &category, &amount, year, description.as_deref()),
        },
        Commands::Entity { command } => match command {
            EntityCommands::Set {
                taxpayer,
                entity_type,
            } => cli::entity::set(&taxpayer, &entity_type),
            EntityCommands::Show { taxpayer } => cli::entity::show(&taxpayer),
            EntityCommands::Types => cli::entity::types(),
        },
        Commands::Categories => cli::categories::list(),
        Commands::Tax {
            taxpayer,
            year,
            json,
        } => cli::tax::run(&taxpayer, year, json),
        Commands::Estimate {
            income,
            expenses,
            rent,
            taxpayer,
            entity,
            json,
        } => cli::estimate::run(
            &income,
            &expenses,
            rent.as_deref(),
            taxpayer.as_deref(),
            entity.as_deref(),
            json,
        ),
        Commands::Rent { command } => match command {
            RentCommands::Set { taxpayer, amount } => cli::rent::set(&taxpayer, &amount),
            RentCommands::Show { taxpayer } => cli::rent::show(&taxpayer),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

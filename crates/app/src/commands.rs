use std::io::BufRead;

use chrono::NaiveDate;
use client::{
    Client, CredentialStore, Transport,
    api_types::{
        auth::RegisterRequest,
        budget::BudgetPatch,
        savings_goal::SavingsGoalPatch,
        transaction::{TransactionFilter, TransactionNew, TransactionType},
    },
};
use dashboard::{BatchOutcome, Dashboard};

use crate::{
    config::Command,
    error::{AppError, Result},
    render,
};

pub async fn run<T: Transport, S: CredentialStore>(
    client: &Client<T, S>,
    command: Command,
) -> Result<()> {
    match command {
        Command::Login { username } => {
            let password = read_password()?;
            client.sign_in(&username, &password).await?;
            println!("Logged in as {username}.");
        }
        Command::Logout => {
            client.sign_out().await?;
            println!("Logged out.");
        }
        Command::Register {
            username,
            email,
            first_name,
            last_name,
        } => {
            let password = read_password()?;
            let user = client
                .register(&RegisterRequest {
                    username,
                    password,
                    email,
                    first_name,
                    last_name,
                })
                .await?;
            println!("Account {} created (id {}).", user.username, user.id);
        }
        Command::Dashboard => {
            let dashboard = Dashboard::new(client);
            if dashboard.load().await? == BatchOutcome::Failed {
                tracing::warn!("dashboard could not be loaded");
            }
            print!("{}", render::dashboard(&dashboard.view()));
        }
        Command::Transactions {
            search,
            ordering,
            month,
            year,
        } => {
            let filter = TransactionFilter {
                period: None,
                month,
                year,
                search,
                ordering,
            };
            let items = client.transactions(&filter).await?;
            print!("{}", render::transactions(&items));
        }
        Command::AddTransaction {
            kind,
            amount,
            description,
            date,
            category,
        } => {
            let transaction = TransactionNew {
                category,
                amount,
                transaction_type: parse_kind(&kind)?,
                description,
                date: parse_date(date.as_deref())?,
            };
            let created = client.create_transaction(&transaction).await?;
            println!("Recorded transaction {}.", created.id);
        }
        Command::Categories => {
            let items = client.categories().await?;
            print!("{}", render::categories(&items));
        }
        Command::Budgets => {
            let items = client.budgets().await?;
            print!("{}", render::budgets(&items));
        }
        Command::SetBudget { id, amount } => {
            let patch = BudgetPatch {
                amount: Some(amount),
                ..BudgetPatch::default()
            };
            let budget = client.update_budget(id, &patch).await?;
            print!("{}", render::budgets(std::slice::from_ref(&budget)));
        }
        Command::Goals => {
            let items = client.savings_goals().await?;
            print!("{}", render::goals(&items));
        }
        Command::SetGoal { id, current_amount } => {
            let patch = SavingsGoalPatch {
                current_amount: Some(current_amount),
                ..SavingsGoalPatch::default()
            };
            let goal = client.update_savings_goal(id, &patch).await?;
            print!("{}", render::goals(std::slice::from_ref(&goal)));
        }
    }
    Ok(())
}

fn read_password() -> Result<String> {
    if let Ok(password) = std::env::var("FINTRACK_PASSWORD") {
        return Ok(password);
    }
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        return Err(AppError::Input("password must not be empty".to_string()));
    }
    Ok(password)
}

fn parse_kind(kind: &str) -> Result<TransactionType> {
    match kind.to_ascii_lowercase().as_str() {
        "income" => Ok(TransactionType::Income),
        "expense" => Ok(TransactionType::Expense),
        other => Err(AppError::Input(format!(
            "unknown transaction kind {other:?}, expected income or expense"
        ))),
    }
}

fn parse_date(date: Option<&str>) -> Result<NaiveDate> {
    match date {
        None => Ok(chrono::Local::now().date_naive()),
        Some(raw) => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|err| AppError::Input(format!("invalid date {raw:?}: {err}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_case_insensitive() {
        assert_eq!(parse_kind("Income").unwrap(), TransactionType::Income);
        assert_eq!(parse_kind("EXPENSE").unwrap(), TransactionType::Expense);
        assert!(parse_kind("refund").is_err());
    }

    #[test]
    fn dates_are_iso() {
        assert_eq!(
            parse_date(Some("2025-11-01")).unwrap(),
            NaiveDate::from_ymd_opt(2025, 11, 1).unwrap()
        );
        assert!(parse_date(Some("01/11/2025")).is_err());
    }
}

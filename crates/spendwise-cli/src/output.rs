//! Plain-text and JSON rendering for command results.

use anyhow::Result;
use serde::Serialize;

use spendwise_core::utils::{format_amount, month_name, truncate_string};
use spendwise_core::{CategorySummary, Expense, MonthlySummary};

/// Widest description shown in expense tables
const DESCRIPTION_WIDTH: usize = 32;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_expense(expense: &Expense) {
    println!(
        "{}  {}  [{}]  {}",
        expense.id,
        format_amount(expense.amount),
        expense.category,
        expense.description
    );
}

pub fn print_expenses(expenses: &[Expense]) {
    if expenses.is_empty() {
        println!("No expenses found.");
        return;
    }
    println!(
        "{:<26} {:<19} {:<14} {:<32} {:>14}",
        "ID", "DATE", "CATEGORY", "DESCRIPTION", "AMOUNT"
    );
    for expense in expenses {
        println!(
            "{:<26} {:<19} {:<14} {:<32} {:>14}",
            expense.id,
            expense.created_display(),
            truncate_string(&expense.category, 14),
            truncate_string(&expense.description, DESCRIPTION_WIDTH),
            format_amount(expense.amount)
        );
    }
}

pub fn print_categories(categories: &[CategorySummary]) {
    if categories.is_empty() {
        println!("No categories yet.");
        return;
    }
    println!("{:<20} {:>6} {:>16}", "CATEGORY", "COUNT", "TOTAL");
    for c in categories {
        println!("{:<20} {:>6} {:>16}", truncate_string(&c.category, 20), c.count, format_amount(c.total));
    }
}

pub fn print_monthly_summary(summary: &[MonthlySummary]) {
    if summary.is_empty() {
        println!("No spending recorded for this period.");
        return;
    }
    println!("{:<15} {:>9} {:>11} {:>16}", "MONTH", "EXPENSES", "CATEGORIES", "TOTAL");
    for m in summary {
        let label = format!("{} {}", month_name(m.month).unwrap_or("?"), m.year);
        println!(
            "{:<15} {:>9} {:>11} {:>16}",
            label,
            m.expense_count,
            m.unique_categories,
            format_amount(m.total_amount)
        );
    }
}

pub mod budget;
pub mod category;
pub mod expense;
pub mod money;
pub mod project;
pub mod recurring;

pub use budget::{BudgetStatus, CategoryTotal, TrendPoint, YearMonth};
pub use category::Category;
pub use expense::{ExpenseRow, NewExpense};
pub use money::Money;
pub use project::{Project, ProjectId};
pub use recurring::{Cadence, NewRecurringExpense, RecurringExpense};

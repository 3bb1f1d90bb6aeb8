mod budget;
mod category;
mod source;
mod transaction;
mod user;

pub use budget::{Budget, BudgetFields};
pub use category::{Category, CategoryFields, TransactionType};
pub use source::{Source, SourceFields, SourceType};
pub use transaction::{Transaction, TransactionFields};
pub use user::User;

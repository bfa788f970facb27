pub mod coindesk;
pub mod google_finance;

pub use coindesk::CoindeskProvider;
pub use google_finance::GoogleFinanceRateProvider;

mod csv_dir;
mod memory;
mod yahoo;

pub use csv_dir::CsvDirectoryProvider;
pub use memory::InMemoryProvider;
pub use yahoo::YahooChartProvider;

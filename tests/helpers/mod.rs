mod test_postgres;

pub use fakes::{FlakyDownloader, MemoryMediaStore};
pub use harness::{
    Harness, fast_dispatch, fast_download, fast_polling, processing_job, wait_for_status,
};
pub use mock_server::spawn_mock_server;
pub use scripted_provider::{ScriptedProvider, params, succeeded_status};
pub use test_postgres::TestPostgres;

use std::io;
use std::net::TcpListener;
use std::time::Duration;

use api::startup::run;
use ingest::test_utils::store::NotifyingStore;

pub struct TestApp {
    pub address: String,
    pub api_client: reqwest::Client,
    pub store: NotifyingStore,
    server_handle: tokio::task::JoinHandle<io::Result<()>>,
}

impl TestApp {
    pub async fn get(&self, route: &str) -> reqwest::Response {
        self.api_client
            .get(format!("{}{route}", self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post(&self, route: &str) -> reqwest::Response {
        self.api_client
            .post(format!("{}{route}", self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}

pub async fn spawn_test_app(store: NotifyingStore) -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let server = run(listener, store.clone(), Duration::from_secs(1))
        .expect("failed to build the reporting server");
    let server_handle = tokio::spawn(server);

    TestApp {
        address: format!("http://127.0.0.1:{port}"),
        api_client: reqwest::Client::new(),
        store,
        server_handle,
    }
}

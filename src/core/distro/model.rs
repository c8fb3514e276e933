use serde::{Deserialize, Serialize};

/// Distribution-wide presence settings (`discord` at the index root).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistroPresence {
    pub client_id: String,
    #[serde(default)]
    pub small_image_text: Option<String>,
    #[serde(default)]
    pub small_image_key: Option<String>,
}

/// Per-server presence settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPresence {
    #[serde(default)]
    pub short_id: Option<String>,
    #[serde(default)]
    pub large_image_text: Option<String>,
    #[serde(default)]
    pub large_image_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub address: String,
    pub minecraft_version: String,
    #[serde(default)]
    pub main_server: bool,
    #[serde(default)]
    pub autoconnect: bool,
    #[serde(default)]
    pub discord: Option<ServerPresence>,
}

impl Server {
    /// `host` and `port` of the server address; the port defaults to 25565.
    pub fn host_and_port(&self) -> (&str, u16) {
        match self.address.rsplit_once(':') {
            Some((host, port)) => match port.parse() {
                Ok(port) => (host, port),
                Err(_) => (self.address.as_str(), 25565),
            },
            None => (self.address.as_str(), 25565),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistroIndex {
    pub version: String,
    #[serde(default)]
    pub discord: Option<DistroPresence>,
    #[serde(default)]
    pub servers: Vec<Server>,
}

impl DistroIndex {
    pub fn server(&self, id: &str) -> Option<&Server> {
        self.servers.iter().find(|server| server.id == id)
    }

    /// The server flagged `mainServer`, else the first one listed.
    pub fn main_server(&self) -> Option<&Server> {
        self.servers
            .iter()
            .find(|server| server.main_server)
            .or_else(|| self.servers.first())
    }
}

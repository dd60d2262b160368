use anyhow::{anyhow, Result};
use async_imap::{Client, Session};
use futures::TryStreamExt;
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncReadCompatExt};

use crate::scanner::Mailbox;
use crate::settings::{Credentials, ImapConfig};
use log::{debug, info};

type ImapStream = Compat<tokio_native_tls::TlsStream<TcpStream>>;

/// Implicit-TLS connection; the certificate is checked against `server`.
async fn connect_to_server(server: &str, port: u16) -> Result<tokio_native_tls::TlsStream<TcpStream>> {
    let tcp_stream = TcpStream::connect((server, port)).await?;
    let tls = tokio_native_tls::TlsConnector::from(native_tls::TlsConnector::new()?);
    let tls_stream = tls.connect(server, tcp_stream).await?;

    info!("-- connected to {}:{}", server, port);
    Ok(tls_stream)
}

/// `LOGIN` with the account credentials. On rejection the client is
/// dropped, which closes the connection.
async fn login_to_server(client: Client<ImapStream>, credentials: &Credentials) -> Result<Session<ImapStream>> {
    let session = client
        .login(&credentials.username, &credentials.password)
        .await
        .map_err(|(e, _client)| e)?;

    info!("-- logged in as {}", credentials.username);
    Ok(session)
}

/// An authenticated IMAP session with `INBOX` selected.
pub struct ImapMailbox {
    session: Session<ImapStream>,
}

impl ImapMailbox {
    pub async fn open(config: &ImapConfig, credentials: &Credentials) -> Result<Self> {
        let tls_stream = connect_to_server(&config.server, config.port).await?;
        let client = Client::new(tls_stream.compat());

        let mut session = login_to_server(client, credentials).await?;

        if let Err(e) = session.select("INBOX").await {
            let _ = session.logout().await;
            return Err(e.into());
        }
        info!("-- INBOX selected");

        Ok(Self { session })
    }
}

impl Mailbox for ImapMailbox {
    async fn unseen(&mut self) -> Result<Vec<u32>> {
        let ids = self.session.search("UNSEEN").await?;
        Ok(ids.into_iter().collect())
    }

    async fn fetch(&mut self, id: u32) -> Result<Vec<u8>> {
        // RFC822 (not BODY.PEEK) so the server flags the message as seen
        let fetches: Vec<_> = self
            .session
            .fetch(id.to_string(), "RFC822")
            .await?
            .try_collect()
            .await?;

        fetches
            .iter()
            .find_map(|fetch| fetch.body())
            .map(|body| body.to_vec())
            .ok_or_else(|| anyhow!("message {} did not have a body", id))
    }

    async fn release(&mut self) {
        if let Err(e) = self.session.close().await {
            debug!("Ignoring error on close: {}", e);
        }
        if let Err(e) = self.session.logout().await {
            debug!("Ignoring error on logout: {}", e);
        }
    }
}

//! Print the OpenAPI document for the HTTP and WebSocket surface as pretty JSON.

use couch_arcade_back::services::documentation::ApiDoc;
use utoipa::OpenApi;

fn main() -> anyhow::Result<()> {
    let doc = ApiDoc::openapi();
    println!("{}", doc.to_pretty_json()?);
    Ok(())
}

//! Raw request handler: `netconsole request GET /devices -P site=hq`.

use netconsole_api::{ApiClient, Method, RequestDescriptor};

use crate::cli::{GlobalOpts, HttpMethod, OutputFormat, RequestArgs};
use crate::error::CliError;
use crate::output;

use super::util;

impl From<HttpMethod> for Method {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// Build the descriptor from parsed arguments.
pub fn descriptor(args: &RequestArgs) -> Result<RequestDescriptor, CliError> {
    let mut req = RequestDescriptor::new(args.method.into(), args.path.clone());
    for raw in &args.params {
        let (key, value) = util::parse_key_value(raw, "param")?;
        req = req.query(key, value);
    }
    if let Some(body) = util::optional_body(args.data.as_deref(), args.from_file.as_deref())? {
        req = req.body(body);
    }
    Ok(req)
}

pub async fn handle(
    client: &ApiClient,
    args: RequestArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let req = descriptor(&args)?;
    let resp = client.request(req).await?;

    tracing::info!(
        status = resp.status().as_u16(),
        elapsed_ms = u64::try_from(resp.elapsed().as_millis()).unwrap_or(u64::MAX),
        "response received"
    );

    if resp.body().is_empty() {
        if !global.quiet {
            eprintln!("✓ {}", resp.status());
        }
        return Ok(());
    }

    // Non-JSON bodies are printed verbatim.
    let out = match resp.json::<serde_json::Value>() {
        Ok(value) => match global.output_format() {
            OutputFormat::Table | OutputFormat::Json | OutputFormat::Plain => {
                output::render_json(&value, false)?
            }
            _ => output::render_single(
                global.output_format(),
                &value,
                |_| String::new(),
                |_| String::new(),
            )?,
        },
        Err(_) => resp.text(),
    };
    output::print_output(&out, global.quiet);
    Ok(())
}

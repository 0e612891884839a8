//! Device command handlers.

use tabled::Tabled;

use netconsole_api::{ApiClient, Device};

use crate::cli::{DeviceListArgs, DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    dtype: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "IP")]
    ip: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Site")]
    site: String,
}

impl From<&Device> for DeviceRow {
    fn from(d: &Device) -> Self {
        Self {
            id: d.id.clone(),
            name: d.name.clone().unwrap_or_default(),
            dtype: d.device_type.clone().unwrap_or_default(),
            status: d.status.clone().unwrap_or_default(),
            ip: d.ip_address.clone().unwrap_or_default(),
            mac: d.mac_address.clone().unwrap_or_default(),
            site: d.site.clone().unwrap_or_default(),
        }
    }
}

fn detail(d: &Device) -> String {
    let mut lines = vec![
        format!("ID:     {}", d.id),
        format!("Name:   {}", d.name.as_deref().unwrap_or("-")),
        format!("Type:   {}", d.device_type.as_deref().unwrap_or("-")),
        format!("Model:  {}", d.model.as_deref().unwrap_or("-")),
        format!("Status: {}", d.status.as_deref().unwrap_or("-")),
        format!("IP:     {}", d.ip_address.as_deref().unwrap_or("-")),
        format!("MAC:    {}", d.mac_address.as_deref().unwrap_or("-")),
        format!("Site:   {}", d.site.as_deref().unwrap_or("-")),
    ];
    for (key, value) in &d.extra {
        let rendered = value
            .as_str()
            .map_or_else(|| value.to_string(), ToOwned::to_owned);
        lines.push(format!("{key}: {rendered}"));
    }
    lines.join("\n")
}

/// Query filters for `GET /devices`.
pub fn list_filters(args: &DeviceListArgs) -> Vec<(&'static str, String)> {
    let mut filters: Vec<(&'static str, String)> = Vec::new();
    if let Some(ref site) = args.site {
        filters.push(("site", site.clone()));
    }
    if let Some(ref status) = args.status {
        filters.push(("status", status.clone()));
    }
    filters
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    client: &ApiClient,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List(list) => {
            let extra: Vec<(String, String)> = list
                .filter
                .iter()
                .map(|raw| util::parse_key_value(raw, "filter"))
                .collect::<Result<_, _>>()?;
            let mut filters: Vec<(&str, String)> = list_filters(&list);
            filters.extend(extra.iter().map(|(k, v)| (k.as_str(), v.clone())));

            let devices = client.list_devices(&filters).await?;
            let out = output::render_list(
                global.output_format(),
                &devices,
                |d| DeviceRow::from(d),
                |d| d.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Get { device } => {
            let found = client
                .get_device(&device)
                .await
                .map_err(|e| CliError::not_found_as(e, "device", &device))?;
            let out = output::render_single(
                global.output_format(),
                &found,
                detail,
                |d| d.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Create(payload) => {
            let body = util::payload(&payload)?;
            let created = client.create_device(&body).await?;
            if !global.quiet {
                eprintln!("✓ Device {} created", created.id);
            }
            let out = output::render_single(
                global.output_format(),
                &created,
                detail,
                |d| d.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Update { device, payload } => {
            let changes = util::payload(&payload)?;
            let updated = client
                .update_device(&device, &changes)
                .await
                .map_err(|e| CliError::not_found_as(e, "device", &device))?;
            let out = output::render_single(
                global.output_format(),
                &updated,
                detail,
                |d| d.id.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DevicesCommand::Delete { device } => {
            if !util::confirm(&format!("Delete device {device}?"), global.yes, "devices delete")? {
                return Ok(());
            }
            client
                .delete_device(&device)
                .await
                .map_err(|e| CliError::not_found_as(e, "device", &device))?;
            if !global.quiet {
                eprintln!("✓ Device {device} deleted");
            }
            Ok(())
        }
    }
}

//! Dashboard rendering from a completed poll cycle.
//!
//! Pages are built by placeholder substitution on embedded templates.

use super::format::{format_number, html_escape, or_dash, state_span};
use crate::admin::{admin_url, smsc_admin_url, AdminAction, SmscAction};
use crate::aggregate::{SummaryRow, LINK_COLUMNS, TRAFFIC_COLUMNS};
use crate::config::InstanceConfig;
use crate::poller::{CycleReport, InstanceReport};
use crate::status::{BoxInfo, LinkCensus, LinkState, Load, SmscInfo};

use chrono::Local;

const DASHBOARD_TEMPLATE: &str = include_str!("templates/dashboard.html");
const LAYOUT_TEMPLATE: &str = include_str!("templates/layout.html");

/// Per-request dashboard settings.
#[derive(Debug, Clone, Copy)]
pub struct DashboardOptions {
    pub refresh_secs: u64,
    pub details: bool,
    pub max_queue: u64,
}

impl DashboardOptions {
    pub fn refresh_down(&self) -> u64 {
        self.refresh_secs.div_ceil(2)
    }

    pub fn refresh_up(&self) -> u64 {
        self.refresh_secs.saturating_mul(2)
    }

    /// Query string that keeps the current settings across reloads.
    fn query(&self, refresh: u64) -> String {
        if self.details {
            format!("?refresh={}&amp;details=1", refresh)
        } else {
            format!("?refresh={}", refresh)
        }
    }
}

/// Render the full dashboard page.
pub fn render_dashboard(report: &CycleReport, opts: &DashboardOptions) -> String {
    let polled_at = report
        .polled_at
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string();

    let content = fill_template(
        DASHBOARD_TEMPLATE,
        &[
            ("polled_at", polled_at),
            ("refresh", opts.refresh_secs.to_string()),
            ("refresh_down", opts.refresh_down().to_string()),
            ("refresh_down_query", opts.query(opts.refresh_down())),
            ("refresh_up", opts.refresh_up().to_string()),
            ("refresh_up_query", opts.query(opts.refresh_up())),
            ("instance_count", report.instances.len().to_string()),
            ("traffic_header", traffic_header()),
            ("link_header", link_header()),
            ("instance_rows", instance_rows(report)),
            ("traffic_rows", traffic_rows(report)),
            ("box_rows", box_rows(report, opts.max_queue)),
            ("link_rows", link_rows(report)),
            ("details", details_section(report, opts)),
        ],
    );

    fill_template(
        LAYOUT_TEMPLATE,
        &[
            ("title", "Gateway Status Monitor".to_string()),
            ("refresh", opts.refresh_secs.to_string()),
            ("refresh_query", opts.query(opts.refresh_secs)),
            ("content", content),
        ],
    )
}

/// Substitute `{{name}}` placeholders in one pass over the template.
///
/// Substituted values are never scanned again. Unknown placeholders are kept.
fn fill_template(template: &str, values: &[(&str, String)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..end];
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + 2 + end + 2]),
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

// ============================================================================
// Instances
// ============================================================================

fn instance_rows(report: &CycleReport) -> String {
    report
        .instances
        .iter()
        .map(instance_row)
        .collect::<Vec<_>>()
        .join("\n")
}

fn instance_row(report: &InstanceReport) -> String {
    let instance = &report.instance;
    let name = html_escape(&instance.name);
    let commands = admin_commands(instance);

    match &report.outcome {
        Ok(status) => {
            let tooltip = format!(
                "Url: {}\n\n{}",
                instance.base_url,
                status.version.as_deref().unwrap_or("-")
            );
            let loads = [
                &status.sms.inbound,
                &status.dlr.inbound,
                &status.sms.outbound,
                &status.dlr.outbound,
            ]
            .into_iter()
            .map(load_cells)
            .collect::<String>();

            format!(
                r#"<tr class="available"><td><span class="instance" title="{}">{}</span></td><td>{}</td><td>{}</td><td>{}</td>{}<td class="commands">{}</td></tr>"#,
                html_escape(&tooltip),
                name,
                state_span(status.overall_state()),
                status.status.started_display(),
                status.status.uptime_display(),
                loads,
                commands
            )
        }
        Err(e) => {
            let loads = load_cells(&Load::default()).repeat(4);
            format!(
                r#"<tr class="unavailable"><td>{}</td><td><span class="state-down" title="{}">error</span></td><td>-</td><td>-</td>{}<td class="commands">{}</td></tr>"#,
                name,
                html_escape(&e.to_string()),
                loads,
                commands
            )
        }
    }
}

fn load_cells(load: &Load) -> String {
    load.averages()
        .iter()
        .map(|avg| format!("<td>{}</td>", html_escape(avg)))
        .collect()
}

fn admin_commands(instance: &InstanceConfig) -> String {
    let links: Vec<String> = AdminAction::ALL
        .iter()
        .map(|action| admin_link(instance, *action))
        .collect();
    format!("{}<br />{}", links[..4].join(" | "), links[4..].join(" | "))
}

fn admin_link(instance: &InstanceConfig, action: AdminAction) -> String {
    match admin_url(instance, action) {
        Ok(url) => format!(
            r#"<a class="admin" href="{}" data-confirm="{}">{}</a>"#,
            html_escape(url.as_str()),
            html_escape(&format!("Send '{}' to {}?", action.as_str(), instance.name)),
            action.as_str()
        ),
        Err(_) => action.as_str().to_string(),
    }
}

// ============================================================================
// Traffic
// ============================================================================

fn traffic_header() -> String {
    TRAFFIC_COLUMNS
        .iter()
        .map(|c| format!("<th>{}</th>", c.label))
        .collect()
}

fn traffic_rows(report: &CycleReport) -> String {
    let summary = &report.summary;
    let mut rows: Vec<String> = summary.rows.iter().map(|r| traffic_row(r, "")).collect();
    rows.push(traffic_row(&summary.total, r#" class="sum""#));
    rows.join("\n")
}

fn traffic_row(row: &SummaryRow, class: &str) -> String {
    let cells: String = row
        .traffic
        .iter()
        .zip(TRAFFIC_COLUMNS.iter())
        .map(|(value, column)| format!("<td>{}</td>", format_number(*value, column.decimals)))
        .collect();
    format!("<tr{}><td>{}</td>{}</tr>", class, html_escape(&row.instance), cells)
}

// ============================================================================
// Boxes
// ============================================================================

fn box_rows(report: &CycleReport, max_queue: u64) -> String {
    let mut rows = Vec::new();

    for (idx, r) in report.instances.iter().enumerate() {
        let name = html_escape(&r.instance.name);
        let boxes = r.status().map(|s| s.boxes.as_slice()).unwrap_or_default();

        if boxes.is_empty() {
            rows.push(format!(
                r#"<tr><td>{}</td><td colspan="7" class="state-down">No boxes connected to this bearerbox!</td></tr>"#,
                name
            ));
            continue;
        }

        for (i, bx) in boxes.iter().enumerate() {
            let class = if idx > 0 && i == 0 { r#" class="sep""# } else { "" };
            rows.push(box_row(&name, bx, class, max_queue));
        }
    }

    rows.join("\n")
}

fn box_row(name: &str, bx: &BoxInfo, class: &str, max_queue: u64) -> String {
    let queued = bx.queued.value();
    let queue_class = if queued > max_queue as f64 {
        r#" class="queue-high""#
    } else {
        ""
    };

    format!(
        "<tr{}><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td{}>{} msgs</td><td>{}</td><td>{}</td><td>{}</td></tr>",
        class,
        name,
        or_dash(bx.kind.as_deref()),
        or_dash(bx.id.as_deref()),
        or_dash(bx.ip.as_deref()),
        queue_class,
        format_number(queued, 0),
        bx.status.started_display(),
        bx.status.uptime_display(),
        or_dash(bx.ssl.as_deref())
    )
}

// ============================================================================
// SMSC census
// ============================================================================

fn link_header() -> String {
    LINK_COLUMNS
        .iter()
        .map(|label| format!("<th>{}</th>", label))
        .collect()
}

fn link_rows(report: &CycleReport) -> String {
    let mut rows: Vec<String> = report
        .instances
        .iter()
        .map(|r| {
            let cells: String = LinkState::ALL
                .into_iter()
                .map(|state| format!("<td>{}</td>", link_cell(&r.census, state)))
                .collect();
            format!(
                "<tr><td>{}</td><td>{}</td>{}</tr>",
                html_escape(&r.instance.name),
                link_total(r.census.total()),
                cells
            )
        })
        .collect();

    let totals: String = report
        .summary
        .total
        .links
        .iter()
        .map(|count| format!("<td>{}</td>", link_total(*count)))
        .collect();
    rows.push(format!(r#"<tr class="sum"><td>Total</td>{}</tr>"#, totals));

    rows.join("\n")
}

fn link_total(count: usize) -> String {
    if count > 0 {
        format!("{} links", count)
    } else {
        "none".to_string()
    }
}

/// Count of links in one state; non-online states drill down to their admin-ids.
fn link_cell(census: &LinkCensus, state: LinkState) -> String {
    let count = census.count(state);
    if count == 0 {
        return "none".to_string();
    }

    match state {
        LinkState::Online => format!(r#"<span class="state-up"><b>{}</b> links</span>"#, count),
        _ => format!(
            r##"<a href="#" class="drill-down" data-state="{}" data-ids="{}"><span class="state-down"><b>{}</b> links</span></a>"##,
            state.as_str(),
            html_escape(&census.joined(state)),
            count
        ),
    }
}

// ============================================================================
// SMSC details
// ============================================================================

fn details_section(report: &CycleReport, opts: &DashboardOptions) -> String {
    if !opts.details {
        return format!(
            r#"<a class="href" href="/?refresh={}&amp;details=1">SMSC connection details</a>"#,
            opts.refresh_secs
        );
    }

    let mut rows = Vec::new();
    for (idx, r) in report.instances.iter().enumerate() {
        let Some(status) = r.status() else {
            continue;
        };
        for (i, smsc) in status.smscs.iter().enumerate() {
            let class = if idx > 0 && i == 0 { r#" class="sep""# } else { "" };
            rows.push(smsc_row(&r.instance, smsc, class));
        }
    }

    format!(
        r#"<h4>SMSC connection details</h4>
<table class="overall">
<tr><th>Instance</th><th>SMSC-ID</th><th>Status</th><th>Uptime</th><th>Received (MO)</th><th>Received (DLR)</th><th>Sent (MT)</th><th>Sent (DLR)</th><th>Failed (MT)</th><th>Queued (MT)</th><th>Admins</th></tr>
{}
</table>"#,
        rows.join("\n")
    )
}

fn smsc_row(instance: &InstanceConfig, smsc: &SmscInfo, class: &str) -> String {
    let counts: String = [
        &smsc.sms_received,
        &smsc.dlr_received,
        &smsc.sms_sent,
        &smsc.dlr_sent,
        &smsc.failed,
        &smsc.queued,
    ]
    .into_iter()
    .map(|m| format!("<td>{}</td>", format_number(m.value(), 0)))
    .collect();

    format!(
        "<tr{}><td>{}</td><td>{} [{}]<br />{}</td><td>{}</td><td>{}</td>{}<td>{}</td></tr>",
        class,
        html_escape(&instance.name),
        or_dash(smsc.id.as_deref()),
        or_dash(smsc.admin_id.as_deref()),
        or_dash(smsc.name.as_deref()),
        state_span(smsc.state()),
        smsc.status.uptime_display(),
        counts,
        smsc_commands(instance, smsc)
    )
}

fn smsc_commands(instance: &InstanceConfig, smsc: &SmscInfo) -> String {
    let Some(admin_id) = smsc.admin_id.as_deref() else {
        return "-".to_string();
    };

    let links: Vec<String> = SmscAction::ALL
        .iter()
        .map(|action| match smsc_admin_url(instance, *action, admin_id) {
            Ok(url) => format!(
                r#"<a class="admin" href="{}" data-confirm="{}">{}</a>"#,
                html_escape(url.as_str()),
                html_escape(&format!("Send '{}' for link {}?", action.as_str(), admin_id)),
                action.label()
            ),
            Err(_) => action.label().to_string(),
        })
        .collect();
    format!("{}<br />{}", links[..2].join(" | "), links[2..].join(" | "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poller::PollError;
    use crate::fetch::FetchError;
    use crate::status::parse_status_document;
    use chrono::Utc;

    const STATUS: &str = r#"<gateway>
        <version>Kannel bearerbox version `1.4.5'.</version>
        <status>running, uptime 0d 2h 0m 0s</status>
        <sms><received><total>1500</total><queued>3</queued></received>
        <sent><total>20</total><queued>0</queued></sent>
        <inbound>0.50,0.25,0.10</inbound><outbound>1.00,0.75,0.50</outbound></sms>
        <boxes><box><type>smsbox</type><id>sb1</id><IP>127.0.0.1</IP><queue>250</queue>
        <status>on-line 120s</status><ssl>no</ssl></box></boxes>
        <smscs>
          <smsc><name>SMPP:a</name><admin-id>a</admin-id><id>A</id><status>online 60s</status></smsc>
          <smsc><name>SMPP:b</name><admin-id>b</admin-id><id>B</id><status>re-connecting</status></smsc>
        </smscs>
    </gateway>"#;

    fn instance(name: &str) -> InstanceConfig {
        InstanceConfig {
            name: name.to_string(),
            base_url: "http://gw:13000".to_string(),
            status_password: "sp".to_string(),
            admin_password: "ap".to_string(),
        }
    }

    fn report() -> CycleReport {
        let status = parse_status_document(STATUS.as_bytes()).unwrap();
        CycleReport::from_outcomes(
            Utc::now(),
            vec![
                (instance("main"), Ok(status)),
                (
                    instance("<backup>"),
                    Err(PollError::Fetch(FetchError::Status(403))),
                ),
            ],
        )
    }

    fn opts(details: bool) -> DashboardOptions {
        DashboardOptions {
            refresh_secs: 5,
            details,
            max_queue: 100,
        }
    }

    #[test]
    fn test_refresh_alternatives() {
        let o = opts(false);
        assert_eq!(o.refresh_down(), 3);
        assert_eq!(o.refresh_up(), 10);
    }

    #[test]
    fn test_dashboard_sections() {
        let page = render_dashboard(&report(), &opts(false));

        assert!(page.contains("2 configured instances"));
        assert!(page.contains(r#"<span class="state-other">running</span>"#));
        assert!(page.contains("<td>0.50</td><td>0.25</td><td>0.10</td>"));
        assert!(page.contains("&lt;backup&gt;"));
        assert!(!page.contains("<backup>"));
        assert!(page.contains("unexpected HTTP status 403"));
        assert!(page.contains("<td>1.500</td>"));
        assert!(page.contains("No boxes connected to this bearerbox!"));
        assert!(page.contains(r#"<td class="queue-high">250 msgs</td>"#));
        assert!(page.contains(r#"data-ids="b""#));
        assert!(page.contains("SMSC connection details</a>"));
        assert!(!page.contains("{{"));
    }

    #[test]
    fn test_details_section() {
        let page = render_dashboard(&report(), &opts(true));
        assert!(page.contains("<h4>SMSC connection details</h4>"));
        assert!(page.contains("A [a]<br />SMPP:a"));
        assert!(page.contains("/stop-smsc?smsc=a&amp;password=ap"));
        assert!(page.contains("?refresh=5&amp;details=1"));
    }

    #[test]
    fn test_link_cells() {
        let report = report();
        let census = &report.instances[0].census;
        assert_eq!(
            link_cell(census, LinkState::Online),
            r#"<span class="state-up"><b>1</b> links</span>"#
        );
        assert_eq!(link_cell(census, LinkState::Dead), "none");
        assert_eq!(link_total(0), "none");
        assert_eq!(link_total(2), "2 links");
    }

    #[test]
    fn test_fill_template_single_pass() {
        let filled = fill_template(
            "<p>{{a}}</p><p>{{b}}</p>{{missing}}{{open",
            &[("a", "{{b}}".to_string()), ("b", "x".to_string())],
        );
        assert_eq!(filled, "<p>{{b}}</p><p>x</p>{{missing}}{{open");
    }

    #[test]
    fn test_reported_text_cannot_pull_in_sections() {
        let body = "<gateway><version>evil {{details}}\n\"quoted\"</version>\
            <status>running, uptime 0d 0h 1m 0s</status>\
            <boxes><box><type>smsbox</type><id>{{link_rows}}</id></box></boxes></gateway>";
        let status = parse_status_document(body.as_bytes()).unwrap();
        let report = CycleReport::from_outcomes(Utc::now(), vec![(instance("main"), Ok(status))]);

        let page = render_dashboard(&report, &opts(false));

        assert!(page.contains(
            "title=\"Url: http://gw:13000\n\nevil {{details}}\n&quot;quoted&quot;\">main</span>"
        ));
        assert!(page.contains("<td>{{link_rows}}</td>"));
        assert_eq!(page.matches("SMSC connection details</a>").count(), 1);
        assert_eq!(
            page.matches(r#"<tr class="sum"><td>Total</td><td>none</td>"#).count(),
            1
        );
    }
}

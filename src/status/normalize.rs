//! Shape normalization of status trees.
//!
//! The generic tree reports a tag that occurs once as a map and a repeated
//! tag as a list, and some gateways wrap single blocks in an extra list
//! level. Each field group has its own folding rule below.

use chrono::{DateTime, Utc};

use super::metric::{Load, Metric};
use super::model::{BoxInfo, Counter, GatewayStatus, SmscInfo, TrafficCounters};
use super::tree::RawNode;
use super::uptime::{parse_status_string_at, StatusLine};
use super::StatusError;

/// Normalize a parsed status document against the current clock.
pub fn normalize(raw: &RawNode) -> Result<GatewayStatus, StatusError> {
    normalize_at(raw, Utc::now())
}

/// Normalize a parsed status document; uptimes are resolved relative to `now`.
pub fn normalize_at(raw: &RawNode, now: DateTime<Utc>) -> Result<GatewayStatus, StatusError> {
    let gateway = match raw.get("gateway").map(first_of_list) {
        Some(node @ RawNode::Map(_)) => node,
        _ => return Err(StatusError::MissingGateway),
    };

    let raw_status = text(gateway, "status");
    let status = status_line(raw_status.as_deref(), now);

    Ok(GatewayStatus {
        status,
        raw_status,
        version: text(gateway, "version"),
        wdp: traffic(fold_section(gateway.get("wdp"))),
        sms: traffic(fold_section(gateway.get("sms"))),
        dlr: traffic(fold_section(gateway.get("dlr"))),
        boxes: fold_boxes(gateway.get("boxes"))
            .into_iter()
            .map(|node| box_info(node, now))
            .collect(),
        smscs: fold_smscs(gateway.get("smscs"))
            .into_iter()
            .map(|node| smsc_info(node, now))
            .collect(),
    })
}

/// `wdp`, `sms`, `dlr`: a section given as a list is replaced by its first element.
pub(crate) fn fold_section(node: Option<&RawNode>) -> Option<&RawNode> {
    node.map(first_of_list)
}

/// `received`, `sent`: a counter given as a list is replaced by its first element.
pub(crate) fn fold_counter(node: Option<&RawNode>) -> Option<&RawNode> {
    node.map(first_of_list)
}

/// `boxes`: always a list of `box` nodes.
pub(crate) fn fold_boxes(node: Option<&RawNode>) -> Vec<&RawNode> {
    fold_collection(node, "box")
}

/// `smscs`: always a list of `smsc` nodes.
pub(crate) fn fold_smscs(node: Option<&RawNode>) -> Vec<&RawNode> {
    fold_collection(node, "smsc")
}

/// Flatten a container whose items are under `tag`.
///
/// Accepts `{tag: item}`, `{tag: [items]}` and a container that was itself
/// repeated, `[{tag: ...}, ...]`, which is flattened one level.
fn fold_collection<'a>(node: Option<&'a RawNode>, tag: &str) -> Vec<&'a RawNode> {
    match node {
        Some(container @ RawNode::Map(_)) => container.get(tag).map(items_of).unwrap_or_default(),
        Some(RawNode::List(containers)) => containers
            .iter()
            .flat_map(|c| match c.get(tag) {
                Some(inner) => items_of(inner),
                None => items_of(c),
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn items_of(node: &RawNode) -> Vec<&RawNode> {
    match node {
        RawNode::Map(_) => vec![node],
        RawNode::List(items) => items.iter().filter(|i| i.is_map()).collect(),
        RawNode::Text(_) => Vec::new(),
    }
}

fn first_of_list(node: &RawNode) -> &RawNode {
    match node {
        RawNode::List(items) => items.first().unwrap_or(node),
        _ => node,
    }
}

fn text(node: &RawNode, key: &str) -> Option<String> {
    first_of_list(node.get(key)?).text().map(str::to_string)
}

fn status_line(raw: Option<&str>, now: DateTime<Utc>) -> StatusLine {
    raw.map(|s| parse_status_string_at(s, now)).unwrap_or_default()
}

fn traffic(section: Option<&RawNode>) -> TrafficCounters {
    let Some(section) = section else {
        return TrafficCounters::default();
    };
    TrafficCounters {
        received: counter(fold_counter(section.get("received"))),
        sent: counter(fold_counter(section.get("sent"))),
        inbound: Load::new(text(section, "inbound")),
        outbound: Load::new(text(section, "outbound")),
        queued: Metric::new(text(section, "queued")),
        store_size: Metric::new(text(section, "storesize")),
        storage: text(section, "storage"),
    }
}

/// A counter block, or a bare value standing for its total.
fn counter(node: Option<&RawNode>) -> Counter {
    match node {
        Some(RawNode::Text(value)) => Counter {
            total: Metric::new(Some(value.clone())),
            queued: Metric::default(),
        },
        Some(block) => Counter {
            total: Metric::new(text(block, "total")),
            queued: Metric::new(text(block, "queued")),
        },
        None => Counter::default(),
    }
}

fn box_info(node: &RawNode, now: DateTime<Utc>) -> BoxInfo {
    BoxInfo {
        kind: text(node, "type"),
        id: text(node, "id"),
        ip: text(node, "IP").or_else(|| text(node, "ip")),
        queued: Metric::new(text(node, "queued").or_else(|| text(node, "queue"))),
        status: status_line(text(node, "status").as_deref(), now),
        ssl: text(node, "ssl"),
    }
}

fn smsc_info(node: &RawNode, now: DateTime<Utc>) -> SmscInfo {
    let raw_status = text(node, "status");
    SmscInfo {
        id: text(node, "id"),
        admin_id: text(node, "admin-id"),
        name: text(node, "name"),
        status: status_line(raw_status.as_deref(), now),
        raw_status,
        sms_received: smsc_traffic(node, "sms", "received"),
        sms_sent: smsc_traffic(node, "sms", "sent"),
        dlr_received: smsc_traffic(node, "dlr", "received"),
        dlr_sent: smsc_traffic(node, "dlr", "sent"),
        failed: Metric::new(text(node, "failed")),
        queued: Metric::new(text(node, "queued")),
    }
}

/// Per-link traffic, laid out either as `sms/received` or `received/sms`.
fn smsc_traffic(smsc: &RawNode, kind: &str, direction: &str) -> Metric {
    let by_kind = fold_section(smsc.get(kind)).and_then(|k| fold_counter(k.get(direction)));
    let by_direction = fold_counter(smsc.get(direction)).and_then(|d| d.get(kind));
    let value = by_kind.or(by_direction).map(first_of_list);
    Metric::new(value.and_then(counter_total))
}

fn counter_total(node: &RawNode) -> Option<String> {
    match node {
        RawNode::Text(value) => Some(value.clone()),
        block => text(block, "total"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::parse_document;
    use chrono::TimeZone;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<gateway>
  <version>Kannel bearerbox version `1.4.5'.
Build `Jan  1 2024 00:00:00', compiler `12.2.0'.</version>
  <status>running, uptime 0d 0h 1m 21s</status>
  <wdp>
    <received><total>0</total><queued>0</queued></received>
    <sent><total>0</total><queued>0</queued></sent>
    <inbound>0.00,0.00,0.00</inbound>
    <outbound>0.00,0.00,0.00</outbound>
  </wdp>
  <sms>
    <received><total>1200</total><queued>4</queued></received>
    <sent><total>900</total><queued>17</queued></sent>
    <storesize>21</storesize>
    <inbound>2.50,1.75,1.00</inbound>
    <outbound>1.10,0.90,0.80</outbound>
  </sms>
  <dlr>
    <received><total>850</total></received>
    <sent><total>0</total></sent>
    <inbound>0.40,0.30,0.20</inbound>
    <outbound>0.00,0.00,0.00</outbound>
    <queued>5</queued>
    <storage>internal</storage>
  </dlr>
  <boxes>
    <box>
      <type>smsbox</type>
      <id>box1</id>
      <IP>127.0.0.1</IP>
      <queue>6</queue>
      <status>on-line 0d 0h 1m 16s</status>
      <ssl>no</ssl>
    </box>
  </boxes>
  <smscs>
    <count>2</count>
    <smsc>
      <name>SMPP:10.0.0.1:2775/2775:user:VMA</name>
      <admin-id>smpp1</admin-id>
      <id>operator</id>
      <status>online 81s</status>
      <failed>2</failed>
      <queued>8</queued>
      <sms><received>700</received><sent>650</sent></sms>
      <dlr><received>500</received><sent>0</sent></dlr>
    </smsc>
    <smsc>
      <name>SMPP:10.0.0.2:2775/2775:user:VMA</name>
      <admin-id>smpp2</admin-id>
      <id>operator</id>
      <status>re-connecting</status>
      <failed>x</failed>
      <received><sms>500</sms><dlr>350</dlr></received>
      <sent><sms>250</sms><dlr>0</dlr></sent>
    </smsc>
  </smscs>
</gateway>"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    fn map(entries: Vec<(&str, RawNode)>) -> RawNode {
        RawNode::Map(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    fn leaf(s: &str) -> RawNode {
        RawNode::Text(s.to_string())
    }

    fn sample_box() -> RawNode {
        map(vec![
            ("type", leaf("smsbox")),
            ("id", leaf("b1")),
            ("queued", leaf("3")),
            ("status", leaf("on-line 5s")),
        ])
    }

    fn gateway_with(key: &str, value: RawNode) -> RawNode {
        map(vec![("gateway", map(vec![(key, value)]))])
    }

    #[test]
    fn test_normalize_sample_document() {
        let tree = parse_document(SAMPLE.as_bytes()).unwrap();
        let status = normalize_at(&tree, now()).unwrap();

        assert_eq!(status.overall_state(), "running");
        assert_eq!(status.status.uptime_display(), "0d 00:01:21");
        assert!(status.version.as_deref().unwrap().contains("1.4.5"));

        assert_eq!(status.sms.received.total.value(), 1200.0);
        assert_eq!(status.sms.received.queued.value(), 4.0);
        assert_eq!(status.sms.sent.queued.value(), 17.0);
        assert_eq!(status.sms.store_size.value(), 21.0);
        assert_eq!(status.sms.inbound.averages(), ["2.50", "1.75", "1.00"]);
        assert_eq!(status.dlr.received.total.value(), 850.0);
        assert_eq!(status.dlr.received.queued.raw(), None);
        assert_eq!(status.dlr.queued.value(), 5.0);
        assert_eq!(status.dlr.storage.as_deref(), Some("internal"));

        assert_eq!(status.boxes.len(), 1);
        let b = &status.boxes[0];
        assert_eq!(b.kind.as_deref(), Some("smsbox"));
        assert_eq!(b.ip.as_deref(), Some("127.0.0.1"));
        assert_eq!(b.queued.value(), 6.0);
        assert_eq!(b.status.state(), "on-line");
        assert_eq!(b.status.uptime_display(), "0d 00:01:16");
        assert_eq!(b.ssl.as_deref(), Some("no"));

        assert_eq!(status.smscs.len(), 2);
        let first = &status.smscs[0];
        assert_eq!(first.admin_id.as_deref(), Some("smpp1"));
        assert_eq!(first.state(), "online");
        assert_eq!(first.status.uptime().unwrap().total_seconds(), 81);
        assert_eq!(first.sms_received.value(), 700.0);
        assert_eq!(first.sms_sent.value(), 650.0);
        assert_eq!(first.dlr_received.value(), 500.0);
        assert_eq!(first.failed.value(), 2.0);
        assert_eq!(first.queued.value(), 8.0);

        let second = &status.smscs[1];
        assert_eq!(second.state(), "re-connecting");
        assert_eq!(second.status, StatusLine::Unrecognized);
        assert_eq!(second.sms_received.value(), 500.0);
        assert_eq!(second.dlr_received.value(), 350.0);
        assert_eq!(second.sms_sent.value(), 250.0);
        assert_eq!(second.failed.value(), 0.0);
        assert_eq!(second.queued.value(), 0.0);
    }

    #[test]
    fn test_missing_gateway_wrapper() {
        let tree = parse_document(b"<status><x>1</x></status>").unwrap();
        assert!(matches!(
            normalize_at(&tree, now()),
            Err(StatusError::MissingGateway)
        ));

        let tree = parse_document(b"<gateway>text only</gateway>").unwrap();
        assert!(matches!(
            normalize_at(&tree, now()),
            Err(StatusError::MissingGateway)
        ));
    }

    #[test]
    fn test_empty_gateway_is_total() {
        let tree = parse_document(b"<gateway><boxes/></gateway>").unwrap();
        let status = normalize_at(&tree, now()).unwrap();

        assert_eq!(status.status, StatusLine::Unrecognized);
        assert!(status.boxes.is_empty());
        assert!(status.smscs.is_empty());
        assert_eq!(status.lookup("sms/received/total"), 0.0);
        assert_eq!(status.sms, TrafficCounters::default());
    }

    #[test]
    fn test_single_box_matches_wrapped_box() {
        let single = gateway_with("boxes", map(vec![("box", sample_box())]));
        let wrapped = gateway_with(
            "boxes",
            map(vec![("box", RawNode::List(vec![sample_box()]))]),
        );

        let a = normalize_at(&single, now()).unwrap();
        let b = normalize_at(&wrapped, now()).unwrap();
        assert_eq!(a.boxes.len(), 1);
        assert_eq!(a.boxes, b.boxes);
        assert_eq!(a.boxes[0].queued.value(), 3.0);
    }

    #[test]
    fn test_fold_boxes_nested_too_deep() {
        let nested = RawNode::List(vec![
            map(vec![("box", RawNode::List(vec![sample_box(), sample_box()]))]),
            map(vec![("box", sample_box())]),
        ]);
        assert_eq!(fold_boxes(Some(&nested)).len(), 3);
        assert!(fold_boxes(None).is_empty());
        assert!(fold_boxes(Some(&leaf(""))).is_empty());
    }

    #[test]
    fn test_fold_smscs_shapes() {
        let smsc = map(vec![("id", leaf("a")), ("status", leaf("online 1s"))]);
        let single = map(vec![("count", leaf("1")), ("smsc", smsc.clone())]);
        let many = map(vec![("smsc", RawNode::List(vec![smsc.clone(), smsc.clone()]))]);

        assert_eq!(fold_smscs(Some(&single)), vec![&smsc]);
        assert_eq!(fold_smscs(Some(&many)).len(), 2);
        assert!(fold_smscs(Some(&map(vec![("count", leaf("0"))]))).is_empty());
    }

    #[test]
    fn test_fold_counter_unwraps_singleton_list() {
        let block = map(vec![("total", leaf("10")), ("queued", leaf("1"))]);
        let listed = RawNode::List(vec![block.clone()]);
        assert_eq!(fold_counter(Some(&listed)), Some(&block));
        assert_eq!(fold_counter(Some(&block)), Some(&block));
        assert_eq!(fold_counter(None), None);

        let section = map(vec![("received", listed)]);
        let gateway = gateway_with("sms", RawNode::List(vec![section]));
        let status = normalize_at(&gateway, now()).unwrap();
        assert_eq!(status.sms.received.total.value(), 10.0);
        assert_eq!(status.sms.received.queued.value(), 1.0);
    }

    #[test]
    fn test_fold_section() {
        let section = map(vec![("inbound", leaf("1.0"))]);
        let listed = RawNode::List(vec![section.clone(), leaf("ignored")]);
        assert_eq!(fold_section(Some(&listed)), Some(&section));
    }

    #[test]
    fn test_smsc_traffic_in_singleton_list() {
        let smsc = map(vec![
            ("admin-id", leaf("x")),
            (
                "sms",
                RawNode::List(vec![map(vec![
                    ("received", leaf("12")),
                    ("sent", leaf("7")),
                ])]),
            ),
        ]);
        let info = smsc_info(&smsc, now());
        assert_eq!(info.sms_received.value(), 12.0);
        assert_eq!(info.sms_sent.value(), 7.0);
        assert_eq!(info.dlr_sent.value(), 0.0);
    }
}

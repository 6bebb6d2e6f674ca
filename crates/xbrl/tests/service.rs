//! The service end to end, with remote documents served from memory.

use approx::assert_relative_eq;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use xbrl::{
    DocumentFetcher, FetchOptions, Result, Statement, Trend, XbrlConfig, XbrlError, XbrlService,
    require_facts,
};

#[derive(Debug, Default)]
struct MapFetcher {
    documents: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<(String, FetchOptions)>>,
}

impl MapFetcher {
    fn serve(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.documents.insert(url.to_string(), body.into());
        self
    }

    fn requests(&self) -> Vec<(String, FetchOptions)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentFetcher for MapFetcher {
    async fn fetch(&self, url: &str, options: FetchOptions) -> Result<Vec<u8>> {
        self.requests.lock().unwrap().push((url.to_string(), options));
        self.documents
            .get(url)
            .cloned()
            .ok_or_else(|| XbrlError::HttpStatus {
                status: 404,
                url: url.to_string(),
            })
    }
}

fn filing(year: i32, revenue: i64, net_income: i64) -> String {
    format!(
        r#"<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance"
    xmlns:iso4217="http://www.xbrl.org/2003/iso4217"
    xmlns:us-gaap="http://fasb.org/us-gaap/2024"
    xmlns:dei="http://xbrl.sec.gov/dei/2024">
  <xbrli:context id="i{year}">
    <xbrli:entity><xbrli:identifier scheme="http://www.sec.gov/CIK">42</xbrli:identifier></xbrli:entity>
    <xbrli:period><xbrli:instant>{year}-12-31</xbrli:instant></xbrli:period>
  </xbrli:context>
  <xbrli:context id="d{year}">
    <xbrli:entity><xbrli:identifier scheme="http://www.sec.gov/CIK">42</xbrli:identifier></xbrli:entity>
    <xbrli:period><xbrli:startDate>{year}-01-01</xbrli:startDate><xbrli:endDate>{year}-12-31</xbrli:endDate></xbrli:period>
  </xbrli:context>
  <xbrli:unit id="usd"><xbrli:measure>iso4217:USD</xbrli:measure></xbrli:unit>
  <dei:DocumentType contextRef="d{year}">10-K</dei:DocumentType>
  <dei:EntityRegistrantName contextRef="d{year}">ABC Corp</dei:EntityRegistrantName>
  <us-gaap:Assets contextRef="i{year}" unitRef="usd" decimals="0">300</us-gaap:Assets>
  <us-gaap:Liabilities contextRef="i{year}" unitRef="usd" decimals="0">100</us-gaap:Liabilities>
  <us-gaap:StockholdersEquity contextRef="i{year}" unitRef="usd" decimals="0">200</us-gaap:StockholdersEquity>
  <us-gaap:LiabilitiesAndStockholdersEquity contextRef="i{year}" unitRef="usd" decimals="0">300</us-gaap:LiabilitiesAndStockholdersEquity>
  <us-gaap:Revenues contextRef="d{year}" unitRef="usd" decimals="0">{revenue}</us-gaap:Revenues>
  <us-gaap:NetIncomeLoss contextRef="d{year}" unitRef="usd" decimals="0">{net_income}</us-gaap:NetIncomeLoss>
</xbrli:xbrl>"#
    )
}

const EMPTY: &str = r#"<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance"/>"#;

fn url(name: &str) -> String {
    format!("https://www.sec.gov/Archives/edgar/data/42/{name}")
}

fn service(fetcher: MapFetcher) -> (XbrlService, Arc<MapFetcher>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("xbrl=debug")
        .with_test_writer()
        .try_init();
    let fetcher = Arc::new(fetcher);
    let config = XbrlConfig::default()
        .with_document_timeout(Duration::from_secs(7))
        .with_concurrency(2);
    (XbrlService::with_fetcher(config, fetcher.clone()), fetcher)
}

#[tokio::test]
async fn test_parse_url_uses_document_limits() {
    let (service, fetcher) = service(MapFetcher::default().serve(&url("abc-2024.xml"), filing(2024, 500, 50)));

    let instance = service.parse_url(&url("abc-2024.xml")).await.unwrap();
    assert_eq!(instance.facts.len(), 8);
    assert_eq!(instance.document_uri, url("abc-2024.xml"));

    let requests = fetcher.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].1.timeout, Duration::from_secs(7));
    assert_eq!(requests[0].1.max_bytes, service.config().max_document_bytes);
}

#[tokio::test]
async fn test_package_url_uses_package_limits() {
    let (service, fetcher) = service(MapFetcher::default());

    let err = service.parse_url(&url("0000000042-24-000001-xbrl.zip")).await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(fetcher.requests()[0].1, FetchOptions::package());
}

#[tokio::test]
async fn test_missing_document_is_an_error() {
    let (service, _) = service(MapFetcher::default());
    let err = service.parse_url(&url("missing.htm")).await.unwrap_err();
    assert!(matches!(err, XbrlError::HttpStatus { status: 404, .. }));
}

#[tokio::test]
async fn test_empty_document_is_ok_until_facts_are_required() {
    let (service, _) = service(MapFetcher::default().serve(&url("empty.xml"), EMPTY));

    let instance = service.parse_url(&url("empty.xml")).await.unwrap();
    assert!(instance.facts.is_empty());
    assert!(matches!(require_facts(instance), Err(XbrlError::NoFacts(_))));
}

#[tokio::test]
async fn test_parse_urls_keeps_order_and_isolates_failures() {
    let fetcher = MapFetcher::default()
        .serve(&url("abc-2022.xml"), filing(2022, 100, 10))
        .serve(&url("abc-2023.xml"), filing(2023, 110, 11));
    let (service, _) = service(fetcher);

    let results = service
        .parse_urls([url("abc-2022.xml"), url("missing.xml"), url("abc-2023.xml")])
        .await;
    let outcome: Vec<(String, bool)> = results.iter().map(|(u, r)| (u.clone(), r.is_ok())).collect();
    assert_eq!(
        outcome,
        [
            (url("abc-2022.xml"), true),
            (url("missing.xml"), false),
            (url("abc-2023.xml"), true),
        ]
    );
}

#[tokio::test]
async fn test_multi_period_through_service() {
    let fetcher = MapFetcher::default()
        .serve(&url("abc-2022.xml"), filing(2022, 100, 10))
        .serve(&url("abc-2023.xml"), filing(2023, 110, 11))
        .serve(&url("abc-2024.xml"), filing(2024, 121, 12));
    let (service, _) = service(fetcher);

    let instances: Vec<_> = service
        .parse_urls([url("abc-2024.xml"), url("abc-2022.xml"), url("abc-2023.xml")])
        .await
        .into_iter()
        .map(|(_, r)| r.unwrap())
        .collect();

    let stitched = service.stitch(&instances);
    assert_eq!(stitched.periods.len(), 3);

    let growth = service.analyze_growth(&stitched, "Revenue").unwrap();
    assert_eq!(growth.trend, Trend::StrongUp);
    assert_relative_eq!(growth.cagr.unwrap(), 10.0, epsilon = 1e-9);

    let ratios = service.calculate_ratios(&stitched);
    assert_relative_eq!(ratios[2].roe.unwrap(), 12.0 / 200.0);
    assert!(service.detect_anomalies(&stitched).is_empty());

    let comparison = service.compare(&instances[..2]);
    assert_eq!(comparison.value("Revenue", 0), Some(121.0));
    assert_eq!(comparison.value("Revenue", 1), Some(100.0));
}

#[test]
fn test_comprehensive_analysis_serializes() {
    let (service, _) = service(MapFetcher::default());
    let instance = service
        .parse_bytes(filing(2024, 500, 50).as_bytes(), "abc-2024.xml", None)
        .unwrap();

    let statements = service.reconstruct_statements(&instance);
    assert_eq!(statements.balance_sheet.len(), 4);

    let analysis = service.comprehensive_analysis(&instance);
    assert!(analysis.validation.is_valid());
    assert!(analysis.potential_issues.is_empty());
    assert_eq!(analysis.metadata.entity_name.as_deref(), Some("ABC Corp"));

    let json = serde_json::to_value(&analysis).unwrap();
    assert_eq!(json["summary"]["fact_count"], 8);
    assert_eq!(json["key_financials"]["Revenues"], 500.0);
    assert_eq!(json["metadata"]["form_type"], "10-K");
    assert_eq!(json["standardized"]["facts"]["NetIncome"]["value"], 50.0);
}

#[test]
fn test_streaming_through_service() {
    let (service, _) = service(MapFetcher::default());
    let doc = filing(2024, 500, 50);

    assert_eq!(service.count_facts(doc.as_bytes()), 8);
    assert_eq!(service.parse_stream(doc.as_bytes()).count(), 8);

    let mut revenue = None;
    let result = service.parse_with_callback(doc.as_bytes(), |fact| {
        if fact.local_name == "Revenues" {
            revenue = fact.normalized_value();
        }
    });
    assert_eq!(revenue, Some(500.0));
    assert_eq!(result.facts_parsed, 8);
}

#[tokio::test]
async fn test_schema_cache_is_shared_and_clearable() {
    const XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
        xmlns:xbrli="http://www.xbrl.org/2003/instance"
        targetNamespace="http://abc.example.com/2024">
      <xs:element name="BacklogRatio" type="xbrli:monetaryItemType"/>
    </xs:schema>"#;
    let (service, _) = service(MapFetcher::default().serve(&url("abc-2024.xsd"), XSD));

    assert!(service.resolver().load_schema(&url("abc-2024.xsd")).await.unwrap().is_some());
    let stats = service.cache_stats();
    assert_eq!(stats.schemas, 1);
    assert_eq!(stats.loaded_schemas, 1);

    service.clear_caches();
    let stats = service.cache_stats();
    assert_eq!(stats.schemas, 0);
    assert_eq!(stats.loaded_schemas, 0);
}

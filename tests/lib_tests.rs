use http_wire::{
    converter::{write_body, InputMessage, MessageConverter, OutputMessage, TargetType},
    converters, header, AnyConverter, Body, BoxError, Charset, ContentDisposition, ContentRange,
    ConverterRegistry, DispositionType, ETag, Error, HeaderError, HeaderMap, HeaderMapExt,
    HeaderValue, HttpRange, MediaType, RangeSpec, RegistryState, Request, Response, StatusCode,
};
use std::any::Any;

#[test]
fn test_media_type_negotiation_order() {
    let mut accepted = MediaType::parse_list(
        "text/*;q=0.9, */*;q=0.1, application/json, text/html;level=1, text/html",
    )
    .unwrap();
    MediaType::sort_by_specificity_and_quality(&mut accepted);
    let rendered: Vec<String> = accepted.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        [
            "text/html;level=1",
            "application/json",
            "text/html",
            "text/*;q=0.9",
            "*/*;q=0.1",
        ]
    );
}

#[test]
fn test_media_type_predicates() {
    let any_json = MediaType::APPLICATION_JSON_ANY;
    let problem = MediaType::parse("application/problem+json").unwrap();
    assert!(any_json.includes(&problem));
    assert!(!problem.includes(&any_json));
    assert!(problem.is_compatible_with(&any_json));
    assert!(any_json.is_compatible_with(&problem));
    assert!(!problem.is_compatible_with(&MediaType::APPLICATION_JSON));
}

#[test]
fn test_content_disposition_rfc5987() {
    let disposition = ContentDisposition::parse(
        "attachment; filename=\"EURO rates.txt\"; filename*=UTF-8''%e2%82%ac%20rates.txt",
    )
    .unwrap();
    assert_eq!(disposition.disposition_type(), DispositionType::Attachment);
    assert_eq!(disposition.filename(), Some("€ rates.txt"));
    assert_eq!(disposition.charset(), Some(Charset::Utf8));
}

#[test]
fn test_content_disposition_encoded_word() {
    let disposition =
        ContentDisposition::parse("form-data; name=\"file\"; filename=\"=?UTF-8?B?w7xiZXIudHh0?=\"")
            .unwrap();
    assert_eq!(disposition.name(), Some("file"));
    assert_eq!(disposition.filename(), Some("über.txt"));

    let rendered = ContentDisposition::form_data()
        .name("file")
        .filename_with_charset("über.txt", Charset::Utf8)
        .build();
    let reparsed = ContentDisposition::parse(&rendered.to_string()).unwrap();
    assert_eq!(reparsed, rendered);
}

#[test]
fn test_content_disposition_errors() {
    let err = ContentDisposition::parse("attachment; filename*=KOI8-R''abc").unwrap_err();
    assert_eq!(err, HeaderError::UnsupportedCharset("KOI8-R".into()));

    let err: Error = ContentDisposition::parse("attachment; filename=\"open")
        .unwrap_err()
        .into();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[test]
fn test_etag_list_recovery() {
    // scanning stops at the first malformed element
    let list = ETag::parse("\"xyzzy\", W/\"r2d2xxxx\", garbage, \"c3piozzzz\"");
    let tags: Vec<&str> = list.tags.iter().map(ETag::tag).collect();
    assert_eq!(tags, ["xyzzy", "r2d2xxxx"]);
    assert!(list.tags[1].is_weak());
    assert!(!list.warnings.is_empty());

    let current = ETag::strong("r2d2xxxx").unwrap();
    assert!(list.matches(&current, false));
    assert!(!list.matches(&current, true));

    let wildcard = ETag::parse("*");
    assert!(wildcard.has_wildcard());
    assert!(wildcard.matches(&current, true));
}

#[test]
fn test_range_scenarios() {
    assert_eq!(
        HttpRange::parse("bytes=-500", 10_000).unwrap(),
        [HttpRange::new(9_500, 9_999).unwrap()]
    );
    assert_eq!(
        HttpRange::parse("bytes=0-99999", 1_000).unwrap(),
        [HttpRange::new(0, 999).unwrap()]
    );

    let err: Error = HttpRange::parse("bytes=1000-", 1_000).unwrap_err().into();
    assert_eq!(err.status(), StatusCode::RANGE_NOT_SATISFIABLE);

    let ranges = HttpRange::parse("bytes=0-9, 5-20, 22-30, -5", 100).unwrap();
    assert_eq!(
        HttpRange::merge(ranges),
        [
            HttpRange::new(0, 20).unwrap(),
            HttpRange::new(22, 30).unwrap(),
            HttpRange::new(95, 99).unwrap(),
        ]
    );

    let specs = RangeSpec::parse_header("bytes=500-, -20").unwrap();
    assert_eq!(RangeSpec::to_header(&specs), "bytes=500-,-20");
}

#[test]
fn test_partial_response_headers() {
    let mut request_headers = HeaderMap::new();
    request_headers.insert(header::RANGE, HeaderValue::from_static("bytes=100-199"));
    request_headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("W/\"v1\""));

    let etag = ETag::weak("v2").unwrap();
    assert!(!request_headers.etags(header::IF_NONE_MATCH).matches(&etag, false));

    let range = request_headers.ranges(1_000).unwrap()[0];
    let mut response_headers = HeaderMap::new();
    response_headers.set_etag(&etag).unwrap();
    response_headers
        .set_content_range(&range.content_range(1_000))
        .unwrap();
    assert_eq!(response_headers[header::CONTENT_RANGE], "bytes 100-199/1000");
    assert_eq!(
        "bytes */1000".parse::<ContentRange>().unwrap(),
        ContentRange::Unsatisfied { total: 1_000 }
    );
}

struct Reverse {
    media_types: Vec<MediaType>,
}

impl MessageConverter for Reverse {
    fn supported_media_types(&self) -> &[MediaType] {
        &self.media_types
    }

    fn matches_type(&self, target: &TargetType) -> bool {
        target.is::<String>()
    }

    fn order(&self) -> i32 {
        -1
    }

    async fn read(
        &self,
        _target: &TargetType,
        message: &mut dyn InputMessage,
    ) -> Result<Box<dyn Any + Send>, BoxError> {
        let text = message.body_mut().take()?.into_string().await?;
        Ok(Box::new(text.chars().rev().collect::<String>()))
    }

    async fn write(
        &self,
        value: &(dyn Any + Send + Sync),
        _target: &TargetType,
        _content_type: Option<&MediaType>,
        message: &mut dyn OutputMessage,
    ) -> Result<(), BoxError> {
        let text = value.downcast_ref::<String>().ok_or("not a string")?;
        let reversed: String = text.chars().rev().collect();
        write_body(message, self.media_types[0].clone(), reversed.into());
        Ok(())
    }
}

fn reverse() -> Reverse {
    Reverse {
        media_types: vec![MediaType::parse("text/x-reversed").unwrap()],
    }
}

#[tokio::test]
async fn test_registry_custom_converter_wins_by_order() {
    let registry = ConverterRegistry::builder().defaults().build();
    registry.add(reverse());
    assert_eq!(registry.state(), RegistryState::Populated);

    let mut request = Request::new(Body::from_text("stressed"));
    request
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/x-reversed"));
    let text: String = registry.read(&mut request).await.unwrap();
    assert_eq!(text, "desserts");

    let mut plain = Request::new(Body::from_text("stressed"));
    plain
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
    let text: String = registry.read(&mut plain).await.unwrap();
    assert_eq!(text, "stressed");

    let accept = MediaType::parse_list("text/x-reversed").unwrap();
    let mut response = Response::new(Body::empty());
    registry
        .write(&String::from("live"), &accept, &mut response)
        .await
        .unwrap();
    assert_eq!(response.headers().content_type().unwrap(), Some(accept[0].clone()));
    let body = std::mem::take(response.body_mut()).into_bytes().await.unwrap();
    assert_eq!(body, "evil");
}

#[tokio::test]
async fn test_registry_fallback_and_errors() {
    let fallback = AnyConverter::new(converters::bytes());
    let registry = ConverterRegistry::builder().fallback(fallback.clone()).build();
    assert_eq!(registry.state(), RegistryState::Unpopulated);

    let target = TargetType::of::<u64>();
    let found = registry.find_readable(&target, None).unwrap();
    assert!(found.same_as(&fallback));

    // the fallback only reads bytes, so reading a u64 through it fails
    let mut request = Request::new(Body::from_text("42"));
    let err = registry.read::<u64>(&mut request).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let empty = ConverterRegistry::new();
    let mut request = Request::new(Body::from_text("42"));
    let err = empty.read::<u64>(&mut request).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[cfg(feature = "json")]
#[tokio::test]
async fn test_json_converter_through_registry() {
    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Order {
        id: u32,
        items: Vec<String>,
    }

    let registry = ConverterRegistry::builder()
        .converter(converters::json::<Order>())
        .defaults()
        .build();

    let mut request = Request::new(Body::from_text(r#"{"id":7,"items":["tea"]}"#));
    request.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json; charset=utf-8"),
    );
    let order: Order = registry.read(&mut request).await.unwrap();
    assert_eq!(order.id, 7);

    let mut response = Response::new(Body::empty());
    let accept = MediaType::parse_list("text/html;q=0.9, application/*;q=0.8").unwrap();
    registry.write(&order, &accept, &mut response).await.unwrap();
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "24");

    let mut response = Response::new(Body::empty());
    let err = registry
        .write(&order, &[MediaType::TEXT_HTML], &mut response)
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_ACCEPTABLE);
}

#[tokio::test]
async fn test_body_round_trip() {
    let mut body = Body::from_bytes("Hello, World!");
    assert_eq!(body.len(), Some(13));
    assert_eq!(body.as_str().await.unwrap(), "Hello, World!");
    let taken = body.take().unwrap();
    assert!(body.is_frozen());
    assert_eq!(taken.into_bytes().await.unwrap(), "Hello, World!");
    assert!(body.into_bytes().await.is_err());
}

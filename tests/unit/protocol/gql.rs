use super::*;

#[test]
fn success_envelope_yields_next_timestamp() {
    let body = r#"{"data":{"act":{"data":[
        {"id":"a","data":{"nextAvailablePixelTimestamp":1648825800000,"__typename":"GetUserCooldownResponseMessageData"}},
        {"id":"b","data":{"timestamp":1648825500000,"__typename":"SetPixelResponseMessageData"}}
    ]}}}"#;
    assert_eq!(
        decode_placement_response(body).unwrap(),
        PlacementResponse::Placed {
            next_available: 1_648_825_800_000
        }
    );
}

#[test]
fn rate_limit_extension_yields_rate_limited() {
    let body = r#"{"errors":[{"message":"Ratelimited","extensions":{"nextAvailablePixelTs":1648825812345.0}}],"data":null}"#;
    assert_eq!(
        decode_placement_response(body).unwrap(),
        PlacementResponse::RateLimited {
            next_available: 1_648_825_812_345
        }
    );
}

#[test]
fn plain_error_is_rejected_with_message() {
    let body = r#"{"errors":[{"message":"user is not logged in"}]}"#;
    assert_eq!(
        decode_placement_response(body).unwrap(),
        PlacementResponse::Rejected {
            message: "user is not logged in".to_string()
        }
    );

    let body = r#"{"error":{"reason":"banned"}}"#;
    assert_eq!(
        decode_placement_response(body).unwrap(),
        PlacementResponse::Rejected {
            message: "banned".to_string()
        }
    );

    let body = r#"{"errors":[{}]}"#;
    assert_eq!(
        decode_placement_response(body).unwrap(),
        PlacementResponse::Rejected {
            message: "Unknown error".to_string()
        }
    );
}

#[test]
fn unparseable_or_empty_bodies_are_protocol_errors() {
    for body in ["<html>502</html>", "{}", r#"{"data":{"act":{"data":[]}}}"#] {
        let err = decode_placement_response(body).unwrap_err();
        assert!(matches!(err, PlacerError::Protocol(_)), "{body}");
    }
}

#[test]
fn request_body_carries_tile_local_coordinates() {
    let req = PlacementRequest {
        local: Position { x: 5, y: 999 },
        quadrant: Quadrant::BOTTOM_RIGHT,
        color: ColorIndex::new(27).unwrap(),
    };
    let body = req.to_body();
    let pixel = &body["variables"]["input"]["PixelMessageData"];
    assert_eq!(pixel["coordinate"]["x"], 5);
    assert_eq!(pixel["coordinate"]["y"], 999);
    assert_eq!(pixel["colorIndex"], 27);
    assert_eq!(pixel["canvasIndex"], 3);
    assert_eq!(body["variables"]["input"]["actionName"], SET_PIXEL_ACTION);
    assert_eq!(body["operationName"], "setPixel");
}

#[test]
fn subscription_messages_have_expected_shape() {
    let init = connection_init("tok");
    assert_eq!(init["payload"]["Authorization"], "Bearer tok");

    let start = subscribe_canvas("AFD2022", Quadrant::TOP_RIGHT);
    assert_eq!(start["type"], "start");
    let channel = &start["payload"]["variables"]["input"]["channel"];
    assert_eq!(channel["teamOwner"], "AFD2022");
    assert_eq!(channel["category"], "CANVAS");
    assert_eq!(channel["tag"], "1");
}

#[test]
fn subscription_frames_decode() {
    let data = r#"{"type":"data","id":"1","payload":{"data":{"subscribe":{"id":"x","data":{"__typename":"FullFrameMessageData","name":"https://cdn/tile.png","timestamp":1}}}}}"#;
    assert_eq!(
        decode_subscription_frame(data).unwrap(),
        SubscriptionFrame::Image("https://cdn/tile.png".to_string())
    );

    let err = r#"{"type":"connection_error","payload":{"message":"401 Unauthorized"}}"#;
    assert_eq!(
        decode_subscription_frame(err).unwrap(),
        SubscriptionFrame::ConnectionError("401 Unauthorized".to_string())
    );

    assert_eq!(
        decode_subscription_frame(r#"{"type":"ka"}"#).unwrap(),
        SubscriptionFrame::Ignored
    );
    let diff = r#"{"type":"data","payload":{"data":{"subscribe":{"data":{"__typename":"DiffFrameMessageData"}}}}}"#;
    assert_eq!(
        decode_subscription_frame(diff).unwrap(),
        SubscriptionFrame::Ignored
    );
    assert!(decode_subscription_frame("nope").is_err());
}

#[test]
fn error_and_complete_frames_end_the_subscription() {
    let err = r#"{"type":"error","id":"1","payload":[{"message":"channel not found"}]}"#;
    assert_eq!(
        decode_subscription_frame(err).unwrap(),
        SubscriptionFrame::Failed("channel not found".to_string())
    );
    let err = r#"{"type":"error","id":"1","payload":{"message":"bad input"}}"#;
    assert_eq!(
        decode_subscription_frame(err).unwrap(),
        SubscriptionFrame::Failed("bad input".to_string())
    );
    assert_eq!(
        decode_subscription_frame(r#"{"type":"error","id":"1"}"#).unwrap(),
        SubscriptionFrame::Failed("subscription error".to_string())
    );
    assert_eq!(
        decode_subscription_frame(r#"{"type":"complete","id":"1"}"#).unwrap(),
        SubscriptionFrame::Completed
    );
}

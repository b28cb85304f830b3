use std::sync::{Arc, Mutex};

use bytes::Bytes;
use http::StatusCode;
use proptest::prelude::*;
use routekit::middleware::{self, Middleware, Next};
use routekit::{Method, Mux, Request, Response};

type Log = Arc<Mutex<Vec<String>>>;

fn record(log: &Log, name: &str) -> Middleware {
    let log = Arc::clone(log);
    let name = name.to_owned();
    middleware::from_fn(move |req: Request, next: Next| {
        log.lock().unwrap().push(name.clone());
        next.run(req)
    })
}

fn terminal(log: &Log) -> impl Fn(Request) -> std::future::Ready<Response> + Send + Sync + 'static {
    let log = Arc::clone(log);
    move |_req: Request| {
        log.lock().unwrap().push("handler".into());
        std::future::ready(Response::text("ok"))
    }
}

fn request(method: http::Method, uri: &str) -> Request {
    http::Request::builder().method(method).uri(uri).body(Bytes::new()).unwrap().into()
}

fn take(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.lock().unwrap())
}

#[tokio::test]
async fn global_group_and_route_middleware_run_outer_to_inner() {
    let log = Log::default();
    let mut mux = Mux::new();
    mux.middleware(record(&log, "m1"));
    mux.group("/api")
        .middleware(record(&log, "m2"))
        .route("/items", |r| {
            r.middleware(record(&log, "m3")).get(terminal(&log));
        });

    let res = mux.dispatch(request(http::Method::GET, "/api/items")).await;

    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(take(&log), ["m1", "m2", "m3", "handler"]);
}

#[tokio::test]
async fn local_middleware_resets_after_each_method() {
    let log = Log::default();
    let mut mux = Mux::new();
    mux.route("/things")
        .middleware(record(&log, "audit"))
        .post(terminal(&log))
        .get(terminal(&log));

    mux.dispatch(request(http::Method::POST, "/things")).await;
    assert_eq!(take(&log), ["audit", "handler"]);

    mux.dispatch(request(http::Method::GET, "/things")).await;
    assert_eq!(take(&log), ["handler"]);
}

#[tokio::test]
async fn group_middleware_accumulates_for_later_routes_only() {
    let log = Log::default();
    let mut mux = Mux::new();
    mux.group("/g")
        .middleware(record(&log, "a"))
        .route("/first", |r| {
            r.get(terminal(&log));
        })
        .middleware(record(&log, "b"))
        .route("/second", |r| {
            r.get(terminal(&log));
        });

    mux.dispatch(request(http::Method::GET, "/g/first")).await;
    assert_eq!(take(&log), ["a", "handler"]);

    mux.dispatch(request(http::Method::GET, "/g/second")).await;
    assert_eq!(take(&log), ["a", "b", "handler"]);
}

#[tokio::test]
async fn global_middleware_added_later_skips_existing_routes() {
    let log = Log::default();
    let mut mux = Mux::new();
    mux.route("/early").get(terminal(&log));
    mux.middleware(record(&log, "late"));
    mux.route("/later").get(terminal(&log));

    mux.dispatch(request(http::Method::GET, "/early")).await;
    assert_eq!(take(&log), ["handler"]);

    mux.dispatch(request(http::Method::GET, "/later")).await;
    assert_eq!(take(&log), ["late", "handler"]);
}

#[tokio::test]
async fn middleware_can_short_circuit() {
    let log = Log::default();
    let deny = middleware::from_fn(|_req: Request, _next: Next| async { Response::unauthorized() });

    let mut mux = Mux::new();
    mux.route("/private").middleware(deny).get(terminal(&log));

    let res = mux.dispatch(request(http::Method::GET, "/private")).await;

    assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    assert!(take(&log).is_empty());
}

#[tokio::test]
async fn last_registration_wins() {
    let mut mux = Mux::new();
    mux.route("/v").get(|_req: Request| async { "first" });
    mux.route("/v").get(|_req: Request| async { "second" });

    let res = mux.dispatch(request(http::Method::GET, "/v")).await;

    assert_eq!(res.body(), "second");
    assert_eq!(mux.routes(), vec![(Method::Get, "/v".to_owned())]);
}

#[tokio::test]
async fn path_params_and_pattern_reach_the_handler() {
    let mut mux = Mux::new();
    mux.route("/users/{id}").get(|req: Request| async move {
        format!("{} {}", req.pattern().unwrap_or_default(), req.param("id").unwrap_or_default())
    });

    let res = mux.dispatch(request(http::Method::GET, "/users/42")).await;

    assert_eq!(res.body(), "/users/{id} 42");
}

#[tokio::test]
async fn unmatched_requests() {
    let mut mux = Mux::new();
    mux.route("/users").get(|_req: Request| async { "list" }).post(|_req: Request| async { "create" });

    let res = mux.dispatch(request(http::Method::DELETE, "/users")).await;
    assert_eq!(res.status_code(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.headers()["allow"], "GET, POST");

    let res = mux.dispatch(request(http::Method::GET, "/nope")).await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(res.body(), "404 page not found\n");

    let res = mux.dispatch(request(http::Method::HEAD, "/users")).await;
    assert_eq!(res.status_code(), StatusCode::OK);
}

#[tokio::test]
async fn muxes_do_not_share_routes() {
    let mut a = Mux::new();
    a.route("/only-a").get(|_req: Request| async { "a" });
    let b = Mux::new();

    let res = b.dispatch(request(http::Method::GET, "/only-a")).await;

    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
}

#[test]
#[should_panic(expected = "invalid route")]
fn conflicting_patterns_panic() {
    let mut mux = Mux::new();
    mux.route("/{a}").get(|_req: Request| async { "a" });
    mux.route("/{b}").get(|_req: Request| async { "b" });
}

proptest! {
    #[test]
    fn root_then_local_in_declaration_order(roots in 0usize..5, locals in 0usize..5) {
        let log = Log::default();
        let mut mux = Mux::new();
        for i in 0..roots {
            mux.middleware(record(&log, &format!("root{i}")));
        }
        let mut route = mux.route("/p");
        for i in 0..locals {
            route = route.middleware(record(&log, &format!("local{i}")));
        }
        route.get(terminal(&log));

        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        runtime.block_on(mux.dispatch(request(http::Method::GET, "/p")));

        let expected: Vec<String> = (0..roots)
            .map(|i| format!("root{i}"))
            .chain((0..locals).map(|i| format!("local{i}")))
            .chain(["handler".to_owned()])
            .collect();
        prop_assert_eq!(take(&log), expected);
    }
}

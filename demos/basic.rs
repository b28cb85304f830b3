//! Minimal routekit example: validated JSON and query endpoints, a JWT
//! protected group and CORS.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl -X POST http://localhost:3000/people \
//!        -H 'content-type: application/json' \
//!        -d '{"age":0,"name":""}'
//!   curl 'http://localhost:3000/people?pageNumber=2&itemsPerPage=1'
//!   curl http://localhost:3000/people/7
//!   curl http://localhost:3000/admin/token
//!   curl -H "authorization: Bearer $TOKEN" http://localhost:3000/admin/me

use jsonwebtoken::Algorithm;
use routekit::middleware::{Jwt, authorize, logger_with_skips, recover, validate_json, validate_path};
use routekit::pagination::{Page, PaginationParams};
use routekit::{Mux, Payload, PayloadError, Request, Response, Server, required};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use validator::Validate;

#[derive(Clone, Debug, Default, Deserialize, Serialize, Validate)]
#[serde(default)]
struct Person {
    #[validate(range(exclusive_min = 0.0))]
    age: f64,
    #[validate(custom(function = "required"), length(min = 3))]
    name: String,
}

impl Payload for Person {
    fn conform(&mut self) -> Result<(), PayloadError> {
        self.name = self.name.trim().to_owned();
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
struct PersonId {
    #[validate(range(min = 1))]
    id: u32,
}

impl Payload for PersonId {}

#[derive(Debug, Deserialize, Serialize)]
struct Claims {
    sub: String,
    role: String,
    exp: u64,
}

#[tokio::main]
async fn main() -> Result<(), routekit::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let jwt = Jwt::new("change-me");

    let mut mux = Mux::new();
    mux.middleware(recover())
        .middleware(logger_with_skips(["/healthz"]))
        .enable_cors();

    mux.route("/healthz").get(|_req: Request| async { Response::data("ok") });

    mux.route("/people")
        .get(list_people)
        .middleware(validate_json::<Person>())
        .post(create_person);

    mux.route("/people/{id}")
        .middleware(validate_path::<PersonId>())
        .get(get_person);

    let issuer = jwt.clone();
    mux.group("/admin")
        .route("/token", move |r| {
            r.get(move |_req: Request| {
                let jwt = issuer.clone();
                async move {
                    let claims = Claims { sub: "1".into(), role: "admin".into(), exp: u64::MAX / 2 };
                    match jwt.sign(Algorithm::HS256, &claims) {
                        Ok(token) => Response::data(&token),
                        Err(_) => Response::bad_request(routekit::ERROR_MESSAGE),
                    }
                }
            });
        })
        .middleware(jwt.authenticate::<Claims>(&["token"]))
        .middleware(authorize(|req| req.claims::<Claims>().is_some_and(|c| c.role == "admin")))
        .route("/me", |r| {
            r.get(|req: Request| async move { Response::data(&req.claims::<Claims>().map(|c| &c.sub)) });
        });

    Server::bind("0.0.0.0:3000")?.serve(mux).await
}

async fn list_people(req: Request) -> Response {
    let params = PaginationParams::from_request(&req, "name", "asc");
    let people = vec![
        Person { age: 31.0, name: "Asif".into() },
        Person { age: 27.0, name: "Bea".into() },
        Person { age: 45.0, name: "Chen".into() },
    ];
    let total = people.len() as u64;
    let items = people
        .into_iter()
        .skip(params.offset() as usize)
        .take(params.limit as usize)
        .collect();

    Response::page(&Page::new(items, &params, total))
}

async fn create_person(req: Request) -> Response {
    match req.json_payload::<Person>() {
        Some(person) => Response::data(person),
        None => Response::bad_request(routekit::ERROR_MESSAGE),
    }
}

async fn get_person(req: Request) -> Response {
    let id = req.path_payload::<PersonId>().map(|p| p.id);
    Response::data(&Person { age: 30.0, name: format!("person-{}", id.unwrap_or_default()) })
}

use super::{build_response, build_response_with_status, with_token, with_user};
use crate::observer::AccountObserver;
use warp::http::StatusCode;
use warp::Filter;

pub fn routes(
    accounts: &AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    signup(accounts.clone())
        .or(login(accounts.clone()))
        .or(logout(accounts.clone()))
        .or(me(accounts.clone()))
}

/// POST api/signup
///
/// Register a new user
///
/// Returns 201 and the created `UserDto`
fn signup(
    accounts: AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || accounts.clone())
        .and(warp::path!("api" / "signup"))
        .and(warp::post())
        .and(warp::body::json())
        .and_then(
            |accounts: AccountObserver, body: dto::SignupRequestDto| async move {
                let resp = accounts
                    .signup(&body.username, &body.email, &body.password)
                    .await
                    .map(dto::UserDto::from);
                build_response_with_status(resp, StatusCode::CREATED)
            },
        )
        .boxed()
}

/// POST api/token
///
/// Exchange username and password for a bearer token
fn login(
    accounts: AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    warp::any()
        .map(move || accounts.clone())
        .and(warp::path!("api" / "token"))
        .and(warp::post())
        .and(warp::body::json())
        .and_then(
            |accounts: AccountObserver, body: dto::LoginRequestDto| async move {
                let resp = accounts
                    .login(body.username, body.password)
                    .await
                    .map(|session| dto::TokenDto {
                        access_token: session.token,
                        token_type: "bearer".to_owned(),
                        expires_at: session.expires_at,
                    });
                build_response(resp)
            },
        )
        .boxed()
}

/// DELETE api/token
///
/// Revoke the token of the current request
fn logout(
    accounts: AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let auth = accounts.clone();
    warp::any()
        .map(move || accounts.clone())
        .and(warp::path!("api" / "token"))
        .and(warp::delete())
        .and(with_user(&auth))
        .and(with_token())
        .and_then(
            |accounts: AccountObserver, _user_id: i32, token: String| async move {
                let resp = accounts
                    .logout(&token)
                    .await
                    .map(|_| super::dto::MessageDto::new("Logged out"));
                build_response(resp)
            },
        )
        .boxed()
}

/// GET api/me
///
/// Returns the `UserDto` of the current user
fn me(
    accounts: AccountObserver,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let auth = accounts.clone();
    warp::any()
        .map(move || accounts.clone())
        .and(warp::path!("api" / "me"))
        .and(warp::get())
        .and(with_user(&auth))
        .and_then(|accounts: AccountObserver, user_id: i32| async move {
            let resp = accounts.me(user_id).await.map(dto::UserDto::from);
            build_response(resp)
        })
        .boxed()
}

///
/// DTO
///
pub mod dto {
    use crate::models::user::UserDao;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct SignupRequestDto {
        pub username: String,
        pub email: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct LoginRequestDto {
        pub username: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct TokenDto {
        pub access_token: String,
        pub token_type: String,
        pub expires_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
    pub struct UserDto {
        pub id: i32,
        pub username: String,
        pub email: String,
        pub created_at: DateTime<Utc>,
    }

    impl From<UserDao> for UserDto {
        fn from(user: UserDao) -> Self {
            UserDto {
                id: user.id(),
                username: user.username().clone(),
                email: user.email().clone(),
                created_at: user.created_at(),
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auth::SessionAuthenticator;
    use crate::models::{memory::MemoryStore, Store};
    use crate::observer::ConcurrentObserver;
    use crate::weather::mock::StaticWeather;
    use std::sync::Arc;

    fn build_mocked_accounts() -> AccountObserver {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let authenticator = SessionAuthenticator::new(store.clone(), chrono::Duration::minutes(30));
        let observer = ConcurrentObserver::new(
            store,
            Arc::new(StaticWeather::sunny()),
            Arc::new(authenticator),
        );
        AccountObserver::new(observer)
    }

    #[tokio::test]
    async fn test_rest_signup_login_me_logout() {
        // Prepare
        let accounts = build_mocked_accounts();
        let routes = routes(&accounts);

        // Execute
        let signup = warp::test::request()
            .path("/api/signup")
            .method("POST")
            .json(&dto::SignupRequestDto {
                username: "farmer".to_owned(),
                email: "farmer@example.org".to_owned(),
                password: "secret-pw".to_owned(),
            })
            .reply(&routes)
            .await;
        let login = warp::test::request()
            .path("/api/token")
            .method("POST")
            .json(&dto::LoginRequestDto {
                username: "farmer".to_owned(),
                password: "secret-pw".to_owned(),
            })
            .reply(&routes)
            .await;
        assert_eq!(login.status(), 200);
        let token: dto::TokenDto = serde_json::from_slice(login.body()).unwrap();
        assert_eq!("bearer", token.token_type);
        let token = token.access_token;
        let me = warp::test::request()
            .path("/api/me")
            .header("authorization", format!("Bearer {}", token))
            .reply(&routes)
            .await;
        let logout = warp::test::request()
            .path("/api/token")
            .method("DELETE")
            .header("authorization", format!("Bearer {}", token))
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(signup.status(), 201);
        assert_eq!(me.status(), 200);
        let user: dto::UserDto = serde_json::from_slice(me.body()).unwrap();
        assert_eq!("farmer", user.username);
        assert_eq!(logout.status(), 200);
        assert!(accounts.identify(&token).await.is_err());
    }

    #[tokio::test]
    async fn test_rest_login_wrong_password() {
        // Prepare
        let accounts = build_mocked_accounts();
        accounts
            .signup("farmer", "farmer@example.org", "secret-pw")
            .await
            .unwrap();
        let routes = routes(&accounts);

        // Execute
        let res = warp::test::request()
            .path("/api/token")
            .method("POST")
            .json(&dto::LoginRequestDto {
                username: "farmer".to_owned(),
                password: "wrong-pw".to_owned(),
            })
            .reply(&routes)
            .await;

        // Validate
        assert_eq!(res.status(), 401);
    }
}

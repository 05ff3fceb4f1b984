pub mod lottery_service;
pub mod lottery_service_impl;
pub mod user_service;
pub mod user_service_impl;

pub use lottery_service::{
    DrawAnomaly, LotteryError, LotteryService, RevealedDraw, RoundOutcome, RoundWinner,
    SubmittedDraw, WinningDraw,
};
pub use lottery_service_impl::SeaOrmLotteryService;
pub use user_service::{
    AuthError, LoginAttempt, LoginOutcome, Registration, RegisteredUser, UserService,
};
pub use user_service_impl::SeaOrmUserService;

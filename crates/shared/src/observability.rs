//! # Observability 基盤
//!
//! トレーシング初期化とログ出力形式の設定を提供する。
//! Strata で構築するすべてのサービスで共通のログ初期化ロジックを集約し、
//! 環境変数 `LOG_FORMAT` による JSON / Pretty 出力の切り替えと、
//! 設定キー `LoggingTimestampFormat` によるタイムスタンプ書式の指定に対応する。
//!
//! リクエスト ID の生成（UUID v7）と HTTP リクエスト用スパンの生成もここに置く。

/// リクエスト ID を運ぶヘッダー名
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// EnvFilter の既定値（`RUST_LOG` 未設定時）
pub const DEFAULT_ENV_FILTER: &str = "info,strata=debug";

/// ログ出力形式
///
/// 環境変数 `LOG_FORMAT` で切り替える。
/// 値が未設定または不正な場合は [`Pretty`](LogFormat::Pretty) にフォールバックする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// JSON 形式（本番環境向け）
    Json,
    /// 人間が読みやすい形式（開発環境向け）
    #[default]
    Pretty,
}

impl LogFormat {
    /// 文字列からログ形式をパースする
    ///
    /// 不正な値の場合は [`Pretty`](LogFormat::Pretty) にフォールバックし、
    /// stderr に警告を出力する。
    pub fn parse(s: &str) -> Self {
        match s {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            other => {
                eprintln!("WARNING: unknown LOG_FORMAT={other:?}, falling back to pretty");
                Self::Pretty
            }
        }
    }

    /// 環境変数 `LOG_FORMAT` から読み取る
    pub fn from_env() -> Self {
        match std::env::var("LOG_FORMAT") {
            Ok(val) => Self::parse(&val),
            Err(_) => Self::default(),
        }
    }
}

/// トレーシング初期化設定
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// サービス名（呼び出し元のルートスパンに付与する）
    pub service_name:     String,
    /// ログ出力形式
    pub log_format:       LogFormat,
    /// タイムスタンプ書式（`[yyyy-MM-dd HH:mm:ss]` 形式）。`None` なら既定の RFC 3339
    pub timestamp_format: Option<String>,
}

impl TracingConfig {
    pub fn new(service_name: impl Into<String>, log_format: LogFormat) -> Self {
        Self {
            service_name: service_name.into(),
            log_format,
            timestamp_format: None,
        }
    }

    /// 環境変数 `LOG_FORMAT` から出力形式を決定する
    pub fn from_env(service_name: impl Into<String>) -> Self {
        Self::new(service_name, LogFormat::from_env())
    }

    pub fn with_timestamp_format(mut self, format: impl Into<String>) -> Self {
        self.timestamp_format = Some(format.into());
        self
    }
}

/// `yyyy-MM-dd HH:mm:ss` 形式の書式を chrono の strftime 書式に変換する
///
/// 対応するトークン: `yyyy` `yy` `MM` `M` `dd` `d` `HH` `H` `hh` `mm` `ss` `f..` `tt`。
/// それ以外の文字はリテラルとして扱う（`%` はエスケープする）。
pub fn dotnet_to_chrono_format(format: &str) -> String {
    let chars: Vec<char> = format.chars().collect();
    let mut out = String::with_capacity(format.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let run = chars[i..].iter().take_while(|&&x| x == c).count();

        let token = match (c, run) {
            ('y', 1..=2) => Some("%y"),
            ('y', _) => Some("%Y"),
            ('M', 1) => Some("%-m"),
            ('M', _) => Some("%m"),
            ('d', 1) => Some("%-d"),
            ('d', _) => Some("%d"),
            ('H', 1) => Some("%-H"),
            ('H', _) => Some("%H"),
            ('h', _) => Some("%I"),
            ('m', _) => Some("%M"),
            ('s', _) => Some("%S"),
            ('f', 1..=3) => Some("%3f"),
            ('f', 4..=6) => Some("%6f"),
            ('f', _) => Some("%9f"),
            ('t', _) => Some("%p"),
            _ => None,
        };

        match token {
            Some(token) => out.push_str(token),
            None => {
                for _ in 0..run {
                    if c == '%' {
                        out.push_str("%%");
                    } else {
                        out.push(c);
                    }
                }
            }
        }
        i += run;
    }

    out
}

/// トレーシングを初期化する
///
/// `RUST_LOG` 環境変数でログレベルを制御可能。
/// 未設定の場合は [`DEFAULT_ENV_FILTER`] を使う。
///
/// グローバルサブスクライバーが既に設定済みの場合は何もせず `false` を返す。
/// テストから複数回呼ばれても安全。
#[cfg(feature = "observability")]
pub fn try_init_tracing(config: &TracingConfig) -> bool {
    use tracing_subscriber::{
        Layer as _,
        fmt::time::{ChronoLocal, SystemTime},
        layer::SubscriberExt,
        util::SubscriberInitExt,
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_ENV_FILTER.into());

    let fmt_layer = match (config.log_format, &config.timestamp_format) {
        (LogFormat::Json, Some(format)) => tracing_subscriber::fmt::layer()
            .with_timer(ChronoLocal::new(dotnet_to_chrono_format(format)))
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        (LogFormat::Json, None) => tracing_subscriber::fmt::layer()
            .with_timer(SystemTime)
            .json()
            .flatten_event(true)
            .with_target(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
        (LogFormat::Pretty, Some(format)) => tracing_subscriber::fmt::layer()
            .with_timer(ChronoLocal::new(dotnet_to_chrono_format(format)))
            .boxed(),
        (LogFormat::Pretty, None) => tracing_subscriber::fmt::layer().boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_ok()
}

/// UUID v7 でリクエスト ID を生成する
///
/// `SetRequestIdLayer::x_request_id(MakeRequestUuidV7)` として使う。
/// 時刻順に並ぶため、ログ上でリクエストの前後関係を追いやすい。
#[cfg(feature = "observability")]
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuidV7;

#[cfg(feature = "observability")]
impl tower_http::request_id::MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(
        &mut self,
        _request: &http::Request<B>,
    ) -> Option<tower_http::request_id::RequestId> {
        let id = uuid::Uuid::now_v7().to_string();
        http::HeaderValue::from_str(&id)
            .ok()
            .map(tower_http::request_id::RequestId::new)
    }
}

/// HTTP リクエスト用のスパンを生成する
///
/// `TraceLayer::new_for_http().make_span_with(make_request_span)` として使う。
#[cfg(feature = "observability")]
pub fn make_request_span<B>(request: &http::Request<B>) -> tracing::Span {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");

    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

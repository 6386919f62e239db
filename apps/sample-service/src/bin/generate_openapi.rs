//! # OpenAPI JSON 生成ツール
//!
//! サンプルサービスの OpenAPI 仕様を JSON 形式で標準出力に出力する。
//!
//! ## 使い方
//!
//! ```bash
//! cargo run --bin generate-openapi -p strata-sample > openapi.json
//! ```

use strata_sample::openapi::ApiDoc;
use utoipa::OpenApi;

fn main() -> anyhow::Result<()> {
    let json = ApiDoc::openapi().to_pretty_json()?;
    println!("{json}");
    Ok(())
}

//! # Strata サンプルサービス
//!
//! サービス層と Web パイプラインを組み合わせた最小構成のマイクロサービス。
//! 商品（Item）の一覧・ページング・取得・登録・削除を提供する。
//!
//! ## モジュール構成
//!
//! | モジュール | 役割 |
//! |------------|------|
//! | [`config`] | サーバー設定と設定ストアの読み込み |
//! | [`app_builder`] | DI コンテナとルーターの構築 |
//! | [`item`] | 商品エンティティ・DTO・リクエスト型 |
//! | [`store`] | 商品ストア（メモリ / PostgreSQL）と ID の採番 |
//! | [`service`] | 商品サービス（[`ApiService`](strata_services::ApiService) を利用） |
//! | [`handler`] | HTTP ハンドラー |
//! | [`user_data`] | 設定ストアからユーザーデータを引く [`UserDataLoader`](strata_web::UserDataLoader) |
//! | [`openapi`] | OpenAPI ドキュメント |

pub mod app_builder;
pub mod config;
pub mod handler;
pub mod item;
pub mod openapi;
pub mod service;
pub mod store;
pub mod user_data;

//! Reference `deps.dev` v3 Insights adapter.
//!
//! Not exercised by this crate's own tests (those run against
//! [`super::fake::FakeInsightsClient`]); this is the implementation an
//! external binary wires up. Talks to `api.deps.dev:443` over TLS using
//! `tonic`'s low-level `Grpc<Channel>` client directly against
//! hand-authored `prost::Message` wire structs, since the `.proto`-generated
//! service stubs are an external collaborator this crate does not vendor.

use std::time::Duration;

use async_trait::async_trait;
use prost::Message;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::transport::Channel;
use tonic::Request;

use super::{
    DependenciesResponse, DependencyNode, InsightsClient, InsightsError, Relation, VersionKey,
    VersionResponse, VersionSummary, VersionsResponse,
};
use crate::version::System;

const ENDPOINT: &str = "https://api.deps.dev:443";
const DEADLINE: Duration = Duration::from_secs(10);

fn system_wire_name(system: System) -> &'static str {
    match system {
        System::Npm => "NPM",
        System::Maven => "MAVEN",
        System::PyPi => "PYPI",
        System::Go => "GO",
    }
}

#[derive(Clone, PartialEq, Message, Default)]
struct WirePackageKey {
    #[prost(string, tag = "1")]
    system: String,
    #[prost(string, tag = "2")]
    name: String,
}

#[derive(Clone, PartialEq, Message, Default)]
struct WireVersionKey {
    #[prost(string, tag = "1")]
    system: String,
    #[prost(string, tag = "2")]
    name: String,
    #[prost(string, tag = "3")]
    version: String,
}

#[derive(Clone, PartialEq, Message, Default)]
struct GetPackageRequest {
    #[prost(message, optional, tag = "1")]
    package_key: Option<WirePackageKey>,
}

#[derive(Clone, PartialEq, Message, Default)]
struct WireVersionSummary {
    #[prost(message, optional, tag = "1")]
    version_key: Option<WireVersionKey>,
    #[prost(bool, tag = "2")]
    is_default: bool,
}

#[derive(Clone, PartialEq, Message, Default)]
struct GetPackageResponse {
    #[prost(message, repeated, tag = "1")]
    versions: Vec<WireVersionSummary>,
}

#[derive(Clone, PartialEq, Message, Default)]
struct GetVersionRequest {
    #[prost(message, optional, tag = "1")]
    version_key: Option<WireVersionKey>,
}

#[derive(Clone, PartialEq, Message, Default)]
struct GetVersionResponse {
    #[prost(message, optional, tag = "1")]
    version_key: Option<WireVersionKey>,
    #[prost(string, repeated, tag = "2")]
    licenses: Vec<String>,
}

#[derive(Clone, PartialEq, Message, Default)]
struct WireDependencyNode {
    #[prost(message, optional, tag = "1")]
    version_key: Option<WireVersionKey>,
    #[prost(enumeration = "WireRelation", tag = "2")]
    relation: i32,
    #[prost(string, repeated, tag = "3")]
    errors: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, prost::Enumeration)]
#[repr(i32)]
enum WireRelation {
    Self_ = 0,
    Direct = 1,
    Indirect = 2,
}

#[derive(Clone, PartialEq, Message, Default)]
struct GetDependenciesRequest {
    #[prost(message, optional, tag = "1")]
    version_key: Option<WireVersionKey>,
}

#[derive(Clone, PartialEq, Message, Default)]
struct GetDependenciesResponse {
    #[prost(message, repeated, tag = "1")]
    nodes: Vec<WireDependencyNode>,
}

/// Thin wrapper around a cloneable `tonic::transport::Channel`; cheap to
/// clone and safe to share across the resolution engine's task pool.
#[derive(Clone)]
pub struct GrpcInsightsClient {
    channel: Channel,
}

impl GrpcInsightsClient {
    pub async fn connect() -> Result<Self, tonic::transport::Error> {
        let channel = Channel::from_static(ENDPOINT).tls_config(Default::default())?.connect().await?;
        Ok(Self { channel })
    }

    pub fn from_channel(channel: Channel) -> Self {
        Self { channel }
    }

    async fn unary<Req, Resp>(&self, path: &str, operation: &str, req: Req) -> Result<Resp, InsightsError>
    where
        Req: Message + Clone + 'static,
        Resp: Message + Default + 'static,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            let mut client = Grpc::new(self.channel.clone());
            client
                .ready()
                .await
                .map_err(|e| InsightsError::Transport {
                    operation: operation.to_string(),
                    message: e.to_string(),
                })?;
            let codec = ProstCodec::<Req, Resp>::default();
            let mut request = Request::new(req.clone());
            request.set_timeout(DEADLINE);
            let path = tonic::codegen::http::uri::PathAndQuery::try_from(path)
                .expect("static rpc path is valid");

            match client.unary(request, path, codec).await {
                Ok(response) => return Ok(response.into_inner()),
                Err(status) if status.code() == tonic::Code::DeadlineExceeded => {
                    if attempts >= super::MAX_RETRY_ATTEMPTS {
                        return Err(InsightsError::DeadlineExceeded {
                            operation: operation.to_string(),
                            attempts,
                        });
                    }
                }
                Err(status) => {
                    return Err(InsightsError::Transport {
                        operation: operation.to_string(),
                        message: status.message().to_string(),
                    })
                }
            }
        }
    }
}

#[async_trait]
impl InsightsClient for GrpcInsightsClient {
    async fn get_versions(&self, system: System, name: &str) -> Result<VersionsResponse, InsightsError> {
        let request = GetPackageRequest {
            package_key: Some(WirePackageKey {
                system: system_wire_name(system).to_string(),
                name: name.to_string(),
            }),
        };
        let response: GetPackageResponse = self
            .unary("/deps_dev.v3.Insights/GetPackage", "get_versions", request)
            .await?;
        Ok(VersionsResponse {
            versions: response
                .versions
                .into_iter()
                .filter_map(|v| {
                    let key = v.version_key?;
                    Some(VersionSummary {
                        version_key: VersionKey {
                            system,
                            name: key.name,
                            version: key.version,
                        },
                        is_default: v.is_default,
                    })
                })
                .collect(),
        })
    }

    async fn get_version(
        &self,
        system: System,
        name: &str,
        version: &str,
    ) -> Result<VersionResponse, InsightsError> {
        let request = GetVersionRequest {
            version_key: Some(WireVersionKey {
                system: system_wire_name(system).to_string(),
                name: name.to_string(),
                version: version.to_string(),
            }),
        };
        let response: GetVersionResponse = self
            .unary("/deps_dev.v3.Insights/GetVersion", "get_version", request)
            .await?;
        Ok(VersionResponse {
            version_key: VersionKey {
                system,
                name: name.to_string(),
                version: version.to_string(),
            },
            licenses: response.licenses,
        })
    }

    async fn get_dependencies(
        &self,
        system: System,
        name: &str,
        version: &str,
    ) -> Result<DependenciesResponse, InsightsError> {
        let request = GetDependenciesRequest {
            version_key: Some(WireVersionKey {
                system: system_wire_name(system).to_string(),
                name: name.to_string(),
                version: version.to_string(),
            }),
        };
        let response: GetDependenciesResponse = self
            .unary(
                "/deps_dev.v3.Insights/GetDependencies",
                "get_dependencies",
                request,
            )
            .await?;
        Ok(DependenciesResponse {
            nodes: response
                .nodes
                .into_iter()
                .filter_map(|node| {
                    let key = node.version_key?;
                    let relation = match node.relation {
                        0 => Relation::Self_,
                        1 => Relation::Direct,
                        _ => Relation::Indirect,
                    };
                    Some(DependencyNode {
                        version_key: VersionKey {
                            system,
                            name: key.name,
                            version: key.version,
                        },
                        relation,
                        errors: node.errors,
                    })
                })
                .collect(),
        })
    }
}

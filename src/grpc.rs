tonic::include_proto!("agrivision");

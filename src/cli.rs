use civic_report_common::ReportStatus;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "civic-report")]
#[command(about = "地域の困りごと（道路・街灯・ゴミなど）を通報・管理するツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// データディレクトリ（設定より優先）
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 通報一覧を表示（絞り込み・検索）
    List {
        /// 課題の種類
        #[arg(short = 't', long)]
        issue_type: Option<String>,

        /// 担当部署
        #[arg(short, long)]
        department: Option<String>,

        /// 対応状況
        #[arg(short, long)]
        status: Option<StatusArg>,

        /// 説明・場所・種類・部署の部分一致（大文字小文字無視）
        #[arg(short = 'q', long)]
        search: Option<String>,

        /// JSONで出力
        #[arg(long)]
        json: bool,
    },

    /// 対応状況の集計
    Stats,

    /// 新しい通報を送信
    Submit {
        /// 内容
        #[arg(short, long)]
        description: Option<String>,

        /// 課題の種類（"Other" の場合は --custom-type も必要）
        #[arg(short = 't', long)]
        issue_type: Option<String>,

        /// 種類が "Other" のときの具体的な種類
        #[arg(long)]
        custom_type: Option<String>,

        /// 担当部署
        #[arg(long)]
        department: Option<String>,

        /// 場所（省略時は座標から逆ジオコーディング）
        #[arg(short, long)]
        location: Option<String>,

        /// 緯度
        #[arg(long, requires = "lon", allow_hyphen_values = true)]
        lat: Option<f64>,

        /// 経度
        #[arg(long, requires = "lat", allow_hyphen_values = true)]
        lon: Option<f64>,

        /// 添付メディアのフォルダ
        #[arg(short, long)]
        media_dir: Option<PathBuf>,

        /// サブフォルダも再帰的にスキャン
        #[arg(short = 'r', long)]
        recursive: bool,

        /// 添付ファイル（複数指定可）
        #[arg(short, long)]
        attach: Vec<PathBuf>,

        /// 送信せずローカルにのみ保存
        #[arg(long)]
        offline: bool,
    },

    /// 対応状況を変更（行政ロール）
    Status {
        /// 通報ID
        #[arg(required = true)]
        id: String,

        #[arg(required = true)]
        status: StatusArg,
    },

    /// 市民へお知らせを送信（行政ロール）
    Notify {
        #[arg(required = true)]
        message: String,
    },

    /// お知らせ一覧（新しい順）
    Notifications,

    /// 全通報をJSONでエクスポート（行政ロール）
    Export {
        /// 出力ファイル（デフォルト: reports-export.json）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// ロールを表示・変更（省略時は対話選択）
    Role {
        role: Option<RoleArg>,
    },

    /// 設定
    Config {
        /// 通報APIのベースURL
        #[arg(long)]
        set_api_url: Option<String>,

        /// 逆ジオコーディングのベースURL
        #[arg(long)]
        set_geocoder_url: Option<String>,

        /// 設定を表示
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Pending,
    InProgress,
    Resolved,
}

impl From<StatusArg> for ReportStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => ReportStatus::Pending,
            StatusArg::InProgress => ReportStatus::InProgress,
            StatusArg::Resolved => ReportStatus::Resolved,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    Citizen,
    Government,
}

impl From<RoleArg> for civic_report_common::Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Citizen => Self::Citizen,
            RoleArg::Government => Self::Government,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_submit() {
        let cli = Cli::try_parse_from([
            "civic-report", "submit", "-d", "Broken light", "-t", "Streetlight Issue",
            "--lat", "12.5", "--lon", "-77.25", "-a", "a.png", "-a", "b.webm",
        ])
        .unwrap();
        match cli.command {
            Commands::Submit { lat, lon, attach, offline, .. } => {
                assert_eq!(lat, Some(12.5));
                assert_eq!(lon, Some(-77.25));
                assert_eq!(attach.len(), 2);
                assert!(!offline);
            }
            _ => panic!("expected submit"),
        }
    }

    #[test]
    fn test_lat_requires_lon() {
        assert!(Cli::try_parse_from(["civic-report", "submit", "--lat", "1.0"]).is_err());
    }

    #[test]
    fn test_status_value() {
        let cli = Cli::try_parse_from(["civic-report", "status", "00003", "in-progress"]).unwrap();
        match cli.command {
            Commands::Status { id, status } => {
                assert_eq!(id, "00003");
                assert_eq!(ReportStatus::from(status), ReportStatus::InProgress);
            }
            _ => panic!("expected status"),
        }
    }
}

//! User-facing denial and validation strings
//!
//! The calling layer asserts on these strings, so they are kept verbatim.

#![allow(missing_docs)]

// Authentication / lifecycle
pub const UNAUTHENTICATED: &str = "로그인이 필요합니다";
pub const ACTOR_DELETED: &str = "삭제된 사용자입니다";
pub const ACTOR_REJECTED: &str = "반려된 사용자입니다";
pub const ACTOR_PENDING: &str = "승인 대기 중인 사용자입니다";
pub const ACTOR_NOT_FOUND: &str = "존재하지 않는 사용자입니다";
pub const ACTOR_EXISTS: &str = "이미 존재하는 사용자입니다";
pub const SIGN_UP_FAILED: &str = "회원가입에 실패하였습니다";
pub const LOAD_FAILED: &str = "데이터를 불러오는 중 문제가 생겼습니다";
pub const WRONG_PASSWORD: &str = "잘못된 비밀번호 입니다";

// Sign-up field validation
pub const INVALID_SN: &str = "잘못된 형식의 군번입니다";
pub const PASSWORD_TOO_SHORT: &str = "비밀번호는 최소 1자리 입니다.";
pub const PASSWORD_TOO_LONG: &str = "비밀번호는 최대 30자리 입니다.";
pub const NAME_TOO_SHORT: &str = "이름은 최소 1자리 입니다.";
pub const NAME_TOO_LONG: &str = "이름은 최대 5자리 입니다.";

// Password management
pub const PASSWORD_SELF_ONLY: &str = "본인만 비밀번호를 변경할 수 있습니다";
pub const PASSWORD_MISMATCH: &str = "새 비밀번호와 재입력이 일치하지 않습니다";
pub const PASSWORD_BLANK: &str = "비밀번호는 최소 한자리입니다";
pub const PASSWORD_CHANGE_FAILED: &str = "비밀번호 변경에 실패했습니다";
pub const NO_RESET_PERMISSION: &str = "비밀번호 초기화 권한이 없습니다";
pub const SELF_RESET: &str = "본인 비밀번호는 초기화 할 수 없습니다";
pub const RESET_FAILED: &str = "비밀번호 초기화에 실패했습니다";

// Actor administration
pub const NO_PERMISSION: &str = "권한이 없습니다";
pub const VERIFY_FAILED: &str = "실패하였습니다";
pub const SELF_DELETE: &str = "본인은 삭제할 수 없습니다";
pub const ADMIN_DELETE: &str = "관리자는 삭제할 수 없습니다";
pub const NO_DELETE_PERMISSION: &str = "유저 삭제 권한이 없습니다";
pub const NO_LIST_PERMISSION: &str = "유저 리스트 조회 권한이 없습니다";

// Permission edits
pub const SELF_EDIT: &str = "본인 정보는 수정할 수 없습니다";
pub const ADMIN_EDIT: &str = "관리자는 수정할 수 없습니다";
pub const NO_PERMISSION_EDIT: &str = "권한 수정 권한이 없습니다";
pub const ADMIN_GRANT: &str = "관리자 권한은 추가할 수 없습니다";
pub const UNKNOWN_PERMISSION: &str = "존재하지 않는 권한입니다";
pub const PERMISSION_UPDATE_FAILED: &str = "권한 변경에 실패하였습니다";

// Grant creation
pub const REASON_REQUIRED: &str = "상벌점 수여 이유를 작성해주세요";
pub const VALUE_NOT_INTEGER: &str = "상벌점은 정수여야 합니다";
pub const VALUE_ZERO: &str = "1점 이상이거나 -1점 미만이어야합니다";
pub const VALUE_OUT_OF_RANGE: &str = "상벌점 값이 너무 큽니다";
pub const TARGET_REQUIRED: &str = "대상을 입력해주세요";
pub const TARGET_NOT_FOUND: &str = "대상이 존재하지 않습니다";
pub const SELF_GRANT: &str = "스스로에게 수여할 수 없습니다";

// Point-granting tiers
pub const NO_MERIT_PERMISSION: &str = "상점을 줄 권한이 없습니다";
pub const NO_LARGE_MERIT_PERMISSION: &str = "5점 이상 상점을 줄 권한이 없습니다";
pub const NO_DEMERIT_PERMISSION: &str = "벌점을 줄 권한이 없습니다";
pub const NO_LARGE_DEMERIT_PERMISSION: &str = "5점 이상 벌점을 줄 권한이 없습니다";

// Grant decisions
pub const GRANT_NOT_FOUND_FOR_DECISION: &str = "본 상벌점이 존재하지 않습니다";
pub const NOT_GIVER: &str = "본인한테 요청된 상벌점만 승인/반려 할 수 있십니다";
pub const ENLISTED_CANNOT_DECIDE: &str = "용사는 상벌점을 승인/반려 할 수 없습니다";
pub const REJECT_REASON_REQUIRED: &str = "반려 사유를 입력해주세요";
pub const ALREADY_DECIDED: &str = "이미 승인/반려된 상벌점입니다";
pub const DECISION_FAILED: &str = "승인/반려에 실패하였습니다";

// Grant deletion
pub const CADRE_CANNOT_DELETE: &str = "간부는 상벌점을 지울 수 없습니다";
pub const GRANT_NOT_FOUND: &str = "상벌점이 존재하지 않습니다";
pub const NOT_RECEIVER: &str = "본인 상벌점만 삭제 할 수 있습니다";
pub const ALREADY_PROCESSED: &str = "이미 수락, 반려, 사용한 상벌점은 지울 수 없습니다";

// Viewing
pub const NO_VIEW_PERMISSION: &str = "상벌점 조회 권한이 없습니다";

// Redemption
pub const REDEEM_VALUE_NOT_POSITIVE: &str = "1점 이상 사용해야 합니다";
pub const REDEEM_REASON_REQUIRED: &str = "상점 사용 이유를 작성해주세요";
pub const ENLISTED_CANNOT_REDEEM: &str = "용사는 상점을 사용 처리할 수 없습니다";
pub const NO_REDEEM_PERMISSION: &str = "상점을 사용할 권한이 없습니다";
pub const REDEEM_TARGET_NOT_ENLISTED: &str = "용사의 상점만 사용할 수 있습니다";
pub const INSUFFICIENT_POINTS: &str = "상점이 부족합니다";

// Point templates
pub const TEMPLATE_VALUE_REQUIRED: &str = "상점 또는 벌점 중 하나 이상을 입력해주세요";
pub const TEMPLATE_VALUE_SIGN: &str = "상점은 양수, 벌점은 음수여야 합니다";
pub const NO_TEMPLATE_PERMISSION: &str = "상벌점 템플릿 관리 권한이 없습니다";

// Storage
pub const UNKNOWN_ERROR: &str = "알 수 없는 오류가 발생했습니다";

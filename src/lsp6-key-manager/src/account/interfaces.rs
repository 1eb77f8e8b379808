//! Solidity interfaces of the controlled account.
//!
//! Used to decode the payloads a controller submits and to encode the reads the contract
//! makes into the account.

use alloy_sol_types::sol;

sol! {
    interface IERC725X {
        function execute(uint256 operationType, address target, uint256 value, bytes data)
            external
            payable
            returns (bytes result);

        function executeBatch(
            uint256[] operationsType,
            address[] targets,
            uint256[] values,
            bytes[] datas
        ) external payable returns (bytes[] results);
    }

    interface IERC725Y {
        function getData(bytes32 dataKey) external view returns (bytes dataValue);
        function setData(bytes32 dataKey, bytes dataValue) external payable;
        function setDataBatch(bytes32[] dataKeys, bytes[] dataValues) external payable;
    }

    interface ILSP14Ownable2Step {
        function pendingOwner() external view returns (address pending);
        function transferOwnership(address newOwner) external;
        function acceptOwnership() external;
        function renounceOwnership() external;
    }

    interface IERC165 {
        function supportsInterface(bytes4 interfaceId) external view returns (bool supported);
    }
}
